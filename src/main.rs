//! Command line entry point
//!
//! ```bash
//! # Convert people.docx into people.xlsx, uploading photos with a token from token.json
//! docx-photo-sheet people.docx
//!
//! # Custom output, folder and photo column names
//! docx-photo-sheet people.docx -o team.xlsx --folder "Team Photos" --photo-header Headshot
//! ```
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use docx_photo_sheet::storage::drive::resolve_access_token;
use docx_photo_sheet::Config;
use docx_photo_sheet::DriveStorage;
use docx_photo_sheet::HttpFetcher;
use docx_photo_sheet::ImagePublisher;
use docx_photo_sheet::XlsxWriter;
use std::path::PathBuf;

/// Convert the table of a Word document into a spreadsheet with public photo links
#[derive(Parser, Debug)]
#[command(name = "docx-photo-sheet")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input `.docx` document
    input: PathBuf,

    /// Output `.xlsx` file [default: input path with .xlsx extension]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Drive folder receiving the uploaded images
    #[arg(long, default_value = docx_photo_sheet::config::DEFAULT_FOLDER_NAME)]
    folder: String,

    /// Header name marking the photo column, repeatable [default: Photo, Image, Picture, Photograph]
    #[arg(long = "photo-header", value_name = "NAME")]
    photo_headers: Vec<String>,

    /// Worksheet name in the output workbook
    #[arg(long, default_value = "Sheet1")]
    sheet_name: String,

    /// OAuth access token for Google Drive
    #[arg(long, env = "DRIVE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Authorized-user token file read when no access token is given
    #[arg(long, default_value = "token.json")]
    token_file: PathBuf,

    /// Default log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut config = Config::new(&args.input)
        .with_folder_name(&args.folder)
        .with_photo_headers(&args.photo_headers);
    if let Some(output) = &args.output {
        config = config.with_output_path(output);
    }

    let token = resolve_access_token(args.access_token.as_deref(), &args.token_file)
        .context("Failed to authenticate to Google Drive")?;
    let storage = DriveStorage::new(token).context("Failed to create Drive client")?;
    let publisher = ImagePublisher::new(storage);
    let fetcher = HttpFetcher::new().context("Failed to create HTTP client")?;

    let writer = XlsxWriter::with_sheet_name(&args.sheet_name);
    let summary = docx_photo_sheet::convert(&config, &publisher, &fetcher, &writer)
        .with_context(|| format!("Failed to convert '{}'", config.input_path.display()))?;

    println!("Saved spreadsheet: {}", config.output_path.display());
    println!(
        "Rows: {}, images uploaded to Drive folder '{}': {}, links kept: {}",
        summary.rows,
        config.folder_name,
        summary.uploads(),
        summary.links_kept
    );
    Ok(())
}

fn init_tracing(default_level: &str) {
    let default_level = default_level.trim();
    let default_level = if default_level.is_empty() {
        "info".to_string()
    } else {
        default_level.to_lowercase()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_repeated_headers_and_defaults() {
        let args = Args::try_parse_from([
            "docx-photo-sheet",
            "people.docx",
            "--photo-header",
            "Avatar",
            "--photo-header",
            "Headshot",
        ])
        .unwrap();
        assert_eq!(args.input, PathBuf::from("people.docx"));
        assert_eq!(args.output, None);
        assert_eq!(args.folder, "DOCX Image Uploads");
        assert_eq!(args.photo_headers, vec!["Avatar", "Headshot"]);
        assert_eq!(args.token_file, PathBuf::from("token.json"));
        assert_eq!(args.sheet_name, "Sheet1");
    }

    #[test]
    fn parses_sheet_name() {
        let args = Args::try_parse_from(["docx-photo-sheet", "people.docx", "--sheet-name", "Team"]).unwrap();
        assert_eq!(args.sheet_name, "Team");
    }
}
