use crate::client::GenerationRequest;
use crate::color::{self, MaybePaint};
use crate::config::Config;
use crate::utils::errors::describe;
use crate::{die, warn, GenerateArgs};

use super::{print_insights, read_piped_stdin};
use super::session::{report_generation_failure, Session};

pub(crate) async fn generate_cmd(config: &Config, args: &GenerateArgs) {
    // The prompt argument wins over standard input, so scripts with a closed or
    // redirected stdin still work.
    let prompt = match &args.prompt {
        Some(prompt) => prompt.clone(),
        None => match read_piped_stdin("prompt") {
            Some(prompt) => prompt,
            None => die!("no prompt given, pass one as an argument or through standard input"),
        },
    };

    let prompt = prompt.trim();

    if prompt.is_empty() {
        die!("the prompt is empty");
    }

    let session = Session::open(config, !args.no_save);

    let schema = match session.schema(&args.source).await {
        Ok(Some(schema)) => schema,
        Ok(None) => {
            warn!("no schema given, the generated SQL may not match your database");
            String::new()
        }
        Err(err) => die!("{}", describe(&err)),
    };

    let request = GenerationRequest::new(prompt, schema);

    match session.generate(args.provider, &request).await {
        Ok(sql) => {
            println!("{}", color::SQL_TEXT.maybe_paint(sql.as_str()));

            if !args.no_insights {
                print_insights(&sql);
            }
        }
        Err(err) => {
            report_generation_failure(&err);
            std::process::exit(crate::utils::errors::DEFAULT_EXIT_CODE);
        }
    }
}
