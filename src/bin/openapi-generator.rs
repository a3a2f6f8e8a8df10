//! Print the competition API's OpenAPI document to stdout, for committing a
//! generated copy or feeding client generators.

use std::process::ExitCode;

use beat_league_back::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() -> ExitCode {
    match ApiDoc::openapi().to_pretty_json() {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("failed to render the OpenAPI document: {error}");
            ExitCode::FAILURE
        }
    }
}
