use crate::config::Config;
use crate::records::{find_schema, NewSchema};
use crate::schema::{read_schema_file, schema_name_from_path};
use crate::utils::errors::describe;
use crate::{die, warn, SchemaCommand};

use super::require_records;

pub(crate) async fn schema_cmd(config: &Config, cmd: &SchemaCommand) {
    let records = require_records(config);

    match cmd {
        SchemaCommand::Save { file, name } => {
            let text = match read_schema_file(file) {
                Ok(text) => text,
                Err(err) => die!("{}", describe(&err)),
            };

            if text.trim().is_empty() {
                warn!("the schema in \"{}\" is empty", file.display());
            }

            let name = name.clone().unwrap_or_else(|| schema_name_from_path(file));

            let schema = NewSchema {
                user_id: config.user_id(),
                name,
                schema: text,
            };

            match records.insert_schema(schema).await {
                Ok(saved) => println!("saved schema \"{}\" (id {})", saved.name, saved.id),
                Err(err) => die!("failed to save the schema: {}", describe(&err)),
            }
        }
        SchemaCommand::Show { name } => {
            match find_schema(records.as_ref(), &config.user_id(), name).await {
                Ok(Some(saved)) => print!("{}", saved.schema),
                Ok(None) => die!("no saved schema is named \"{}\"", name),
                Err(err) => die!("failed to look up the schema: {}", describe(&err)),
            }
        }
    }
}
