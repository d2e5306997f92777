//! Terminal consent provider for `certgate check`.
//!
//! Shows unsigned artifacts and untrusted signers on stderr and asks the
//! operator with `dialoguer` prompts. Rejects automatically when no terminal
//! is attached.

use async_trait::async_trait;
use certgate::{
    Certificate, ConsentProvider, ConsentRequest, ConsentResult, SignerChain, TrustError,
    TrustResult,
};
use dialoguer::{theme::ColorfulTheme, Confirm, MultiSelect};
use std::io::IsTerminal;

/// Interactive terminal consent provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConsent;

/// What the operator answered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Answers {
    proceed: bool,
    selected: Vec<usize>,
    remember: bool,
}

impl TerminalConsent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConsentProvider for TerminalConsent {
    async fn request_decision(&self, request: &ConsentRequest) -> TrustResult<ConsentResult> {
        if !std::io::stdin().is_terminal() || !std::io::stderr().is_terminal() {
            eprintln!("[certgate] No terminal available for interactive approval, rejecting.");
            return Ok(ConsentResult::reject());
        }

        let owned = request.clone();
        let answers = tokio::task::spawn_blocking(move || ask(&owned))
            .await
            .map_err(|e| TrustError::Consent {
                message: format!("prompt task failed: {}", e),
            })??;

        Ok(build_result(request, &answers))
    }
}

fn ask(request: &ConsentRequest) -> TrustResult<Answers> {
    let theme = ColorfulTheme::default();
    let mut answers = Answers {
        proceed: true,
        ..Answers::default()
    };

    if let Some(unsigned) = &request.unsigned_details {
        eprintln!();
        eprintln!("[certgate] The following artifacts are not signed:");
        for artifact in unsigned {
            eprintln!("[certgate]   {}", artifact);
        }
        answers.proceed = Confirm::with_theme(&theme)
            .with_prompt("Install unsigned content anyway?")
            .default(false)
            .interact()
            .map_err(prompt_error)?;
        if !answers.proceed {
            return Ok(answers);
        }
    }

    if let Some(chains) = &request.untrusted_chains {
        eprintln!();
        eprintln!("[certgate] The following signers are not trusted:");
        for chain in chains {
            eprintln!("[certgate]   {}", describe_chain(chain));
        }
        let items: Vec<String> = chains.iter().map(|c| c.leaf().key_id()).collect();
        answers.selected = MultiSelect::with_theme(&theme)
            .with_prompt("Select the signers to trust (space to toggle, enter to confirm)")
            .items(&items)
            .interact()
            .map_err(prompt_error)?;

        if !answers.selected.is_empty() {
            answers.remember = Confirm::with_theme(&theme)
                .with_prompt("Remember the selected signers for future runs?")
                .default(false)
                .interact()
                .map_err(prompt_error)?;
        }
    }

    Ok(answers)
}

fn build_result(request: &ConsentRequest, answers: &Answers) -> ConsentResult {
    if !answers.proceed {
        return ConsentResult::reject();
    }
    let Some(chains) = &request.untrusted_chains else {
        return ConsentResult::accept_unsigned();
    };

    let selected: Vec<Certificate> = answers
        .selected
        .iter()
        .filter_map(|&i| chains.get(i))
        .map(|chain| chain.leaf().clone())
        .collect();
    ConsentResult::trust(selected).persist(answers.remember)
}

/// Leaf key id followed by its issuers.
fn describe_chain(chain: &SignerChain) -> String {
    if chain.issuers().is_empty() {
        return chain.leaf().key_id();
    }
    let issuers: Vec<String> = chain.issuers().iter().map(Certificate::key_id).collect();
    format!("{} (issued by {})", chain.leaf().key_id(), issuers.join(" <- "))
}

fn prompt_error(e: dialoguer::Error) -> TrustError {
    TrustError::Consent {
        message: format!("prompt failed: {}", e),
    }
}
