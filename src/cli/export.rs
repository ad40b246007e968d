use std::path::PathBuf;

use crate::config::Config;
use crate::records::{export_file_name, export_json, RecordStore};
use crate::utils::errors::describe;
use crate::{die, ExportArgs, ExportObject};

use super::require_records;

async fn export_contents(
    records: &dyn RecordStore,
    user_id: &str,
    object: ExportObject,
    search: Option<&str>,
) -> Result<(usize, String), crate::records::Error> {
    match object {
        ExportObject::Queries => {
            let queries = records.queries(user_id, search).await?;

            Ok((queries.len(), export_json(&queries)?))
        }
        ExportObject::Schemas => {
            let schemas = records.schemas(user_id, search).await?;

            Ok((schemas.len(), export_json(&schemas)?))
        }
    }
}

pub(crate) async fn export_cmd(config: &Config, args: &ExportArgs) {
    let records = require_records(config);

    let (count, contents) = match export_contents(
        records.as_ref(),
        &config.user_id(),
        args.object,
        args.search.search.as_deref(),
    )
    .await
    {
        Ok(exported) => exported,
        Err(err) => die!("failed to export {}: {}", args.object, describe(&err)),
    };

    let path = args.output.clone().unwrap_or_else(|| {
        let today = chrono::Local::now().date_naive();

        PathBuf::from(export_file_name(&args.object.to_string(), today))
    });

    if let Err(err) = std::fs::write(&path, contents) {
        die!("failed to write \"{}\": {}", path.display(), err);
    }

    println!("exported {} {} to {}", count, args.object, path.display());
}
