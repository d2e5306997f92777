use super::args::*;
use crate::exit_codes::SUCCESS;

pub mod check;
pub mod keygen;
pub mod sign;
pub mod trust;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Check(args) => check::run(args).await,
        Command::Keygen(args) => Ok(keygen::cmd_keygen(args)),
        Command::Sign(args) => Ok(sign::cmd_sign(args).await),
        Command::Trust(args) => trust::run(args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
