use strum::IntoEnumIterator;
use table::{one_line, IntoTable, Table};
mod table;

use crate::client::{active_provider, ClientSettings};
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::providers::apireq::redact;
use crate::providers::ProviderIdentifier;
use crate::records::{SavedQuery, SavedSchema};
use crate::schema::count_tables;
use crate::utils::errors::describe;
use crate::{die, ListArgs, ListObject, ListingFormat};

use super::{open_credentials, require_records};

const PREVIEW_WIDTH: usize = 60;

#[derive(serde::Serialize, Debug, PartialEq)]
struct Provider {
    provider: ProviderIdentifier,
    name: &'static str,
    model: String,
    key: Option<String>,
    active: bool,
}

impl From<Vec<Provider>> for Table {
    fn from(value: Vec<Provider>) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["PROVIDER", "NAME", "MODEL", "KEY", "ACTIVE"]);

        for provider in value {
            tab.add_row(vec![
                provider.provider.to_string(),
                provider.name.to_string(),
                provider.model,
                provider.key.unwrap_or_else(|| "-".to_string()),
                if provider.active { "yes" } else { "no" }.to_string(),
            ]);
        }

        tab
    }
}

impl From<Vec<SavedQuery>> for Table {
    fn from(value: Vec<SavedQuery>) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["ID", "CREATED", "PROMPT", "SQL"]);

        for query in value {
            tab.add_row(vec![
                query.id.to_string(),
                query.created_at.format("%Y-%m-%d %H:%M").to_string(),
                one_line(&query.prompt, PREVIEW_WIDTH),
                one_line(&query.sql, PREVIEW_WIDTH),
            ]);
        }

        tab
    }
}

impl From<Vec<SavedSchema>> for Table {
    fn from(value: Vec<SavedSchema>) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["ID", "CREATED", "NAME", "TABLES", "LINES"]);

        for schema in value {
            tab.add_row(vec![
                schema.id.to_string(),
                schema.created_at.format("%Y-%m-%d %H:%M").to_string(),
                schema.name,
                count_tables(&schema.schema).to_string(),
                schema.schema.lines().count().to_string(),
            ]);
        }

        tab
    }
}

fn get_providers<S: CredentialStore + ?Sized>(
    store: &S,
    config: &Config,
) -> Result<Vec<Provider>, crate::client::Error> {
    let active = active_provider(store, config)?;

    let mut providers = Vec::new();

    for id in ProviderIdentifier::iter() {
        let settings = ClientSettings::resolve(store, config, Some(id))?;

        providers.push(Provider {
            provider: id,
            name: id.display_name(),
            model: settings.model,
            key: settings.credential.as_deref().map(redact),
            active: id == active,
        });
    }

    Ok(providers)
}

fn format_output<O: IntoTable + serde::Serialize>(object: O, format: ListingFormat) {
    match format {
        ListingFormat::Json => match serde_json::to_string_pretty(&object) {
            Ok(output) => println!("{}", output),
            Err(err) => die!("failed to serialize the listing: {}", err),
        },
        ListingFormat::Table => {
            let tab = object.into_table();

            print!("{}", tab);
        }
        ListingFormat::HeaderlessTable => {
            let mut tab = object.into_table();

            tab.print_header(false);

            print!("{}", tab);
        }
    }
}

pub(crate) async fn list_cmd(config: &Config, args: &ListArgs) {
    let format = args.format;

    match &args.object {
        ListObject::Providers => {
            let store = open_credentials(config);

            match get_providers(&store, config) {
                Ok(providers) => format_output(providers, format),
                Err(err) => die!("failed to list providers: {}", describe(&err)),
            }
        }
        ListObject::Queries(search) => {
            let records = require_records(config);

            match records
                .queries(&config.user_id(), search.search.as_deref())
                .await
            {
                Ok(queries) => format_output(queries, format),
                Err(err) => die!("failed to list queries: {}", describe(&err)),
            }
        }
        ListObject::Schemas(search) => {
            let records = require_records(config);

            match records
                .schemas(&config.user_id(), search.search.as_deref())
                .await
            {
                Ok(schemas) => format_output(schemas, format),
                Err(err) => die!("failed to list schemas: {}", describe(&err)),
            }
        }
    }
}
