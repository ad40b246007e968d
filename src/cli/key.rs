use std::io::{self, BufRead, Write};

use crate::config::Config;
use crate::credentials::{credential_key, save_credential, CredentialStore};
use crate::providers::{CredentialCheck, ProviderIdentifier};
use crate::utils::errors::describe;
use crate::{die, warn, KeyCommand};

use super::{open_credentials, read_piped_stdin};

/// Asks for the key on the terminal, or takes everything piped in.
fn read_secret(provider: ProviderIdentifier) -> String {
    if let Some(secret) = read_piped_stdin("API key") {
        return secret;
    }

    eprint!("{} API key: ", provider.display_name());

    if let Err(err) = io::stderr().flush() {
        die!("failed to flush the terminal: {}", err);
    }

    let mut line = String::new();

    if let Err(err) = io::stdin().lock().read_line(&mut line) {
        die!("failed to read the API key: {}", err);
    }

    line
}

pub(crate) fn key_cmd(config: &Config, cmd: &KeyCommand) {
    let mut store = open_credentials(config);

    match cmd {
        KeyCommand::Set { provider, secret } => {
            let secret = match secret {
                Some(secret) => secret.clone(),
                None => read_secret(*provider),
            };

            let check = match save_credential(&mut store, *provider, &secret) {
                Ok(check) => check,
                Err(err) => die!("{}", describe(&err)),
            };

            if let CredentialCheck::NonConforming { expected_prefix } = check {
                warn!(
                    "{} API keys typically start with '{}', the key was saved anyway",
                    provider.display_name(),
                    expected_prefix
                );
            }

            println!(
                "saved the {} API key to {}",
                provider.display_name(),
                store.path().display()
            );
        }
        KeyCommand::Remove { provider } => match store.remove(&credential_key(*provider)) {
            Ok(true) => println!("removed the {} API key", provider.display_name()),
            Ok(false) => warn!("no {} API key was stored", provider.display_name()),
            Err(err) => die!("{}", describe(&err)),
        },
    }
}
