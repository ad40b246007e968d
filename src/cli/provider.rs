use crate::client::ClientSettings;
use crate::color::{self, MaybePaint};
use crate::config::Config;
use crate::credentials::{load_credential, select_provider};
use crate::providers::apireq::redact;
use crate::utils::errors::describe;
use crate::{die, warn, ProviderCommand};

use super::open_credentials;

pub(crate) fn provider_cmd(config: &Config, cmd: &ProviderCommand) {
    let mut store = open_credentials(config);

    match cmd {
        ProviderCommand::Use { provider } => {
            if let Err(err) = select_provider(&mut store, *provider) {
                die!("{}", describe(&err));
            }

            println!("switched to {}", provider.display_name());

            match load_credential(&store, *provider) {
                Ok(Some(_)) => {}
                Ok(None) => warn!(
                    "no {} API key is stored, save one with `nlsql key set {}`",
                    provider.display_name(),
                    provider
                ),
                Err(err) => die!("{}", describe(&err)),
            }
        }
        ProviderCommand::Show => {
            let settings = match ClientSettings::resolve(&store, config, None) {
                Ok(settings) => settings,
                Err(err) => die!("{}", describe(&err)),
            };

            println!(
                "provider: {} ({})",
                settings.provider.display_name(),
                settings.provider
            );
            println!("model:    {}", settings.model);
            println!("endpoint: {}", settings.endpoint);

            let key = settings
                .credential
                .as_deref()
                .map(redact)
                .unwrap_or_else(|| "not set".to_string());

            println!("key:      {}", color::MASKED_TEXT.maybe_paint(key.as_str()));
        }
    }
}
