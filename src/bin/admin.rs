use std::collections::VecDeque;
use std::path::PathBuf;

use auto_infracao::domain::InfractionId;
use auto_infracao::export::{download_filename, PdfExporter};
use auto_infracao::server::{connect_store, DEFAULT_DATABASE_URL};
use auto_infracao::viewer::RecordView;

fn print_help() {
    eprintln!(
        "\
auto-infracao-admin

USAGE:
  auto-infracao-admin <command> [options]

COMMANDS:
  migrate                         Run database migrations
  show                            Print a stored infraction as JSON
  export-pdf                      Write a stored infraction as PDF

COMMON OPTIONS:
  --database-url <url>            postgres://... or sqlite:...
                                  (defaults to env DATABASE_URL, then {DEFAULT_DATABASE_URL})

show OPTIONS:
  --id <n>                        (required) Infraction id

export-pdf OPTIONS:
  --id <n>                        (required) Infraction id
  --output <path>                 (optional) Output file (default: auto_infracao_<id>.pdf)
"
    );
}

fn resolve_database_url(database_url: Option<String>) -> String {
    database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

fn take_value(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<String> {
    args.pop_front()
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

fn parse_id(raw: &str) -> anyhow::Result<InfractionId> {
    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid --id {raw:?}: {e}"))
}

#[derive(Debug, Default)]
struct Options {
    database_url: Option<String>,
    id: Option<InfractionId>,
    output: Option<PathBuf>,
    help: bool,
}

fn parse_options(mut args: VecDeque<String>, accept: &[&str]) -> anyhow::Result<Options> {
    let mut opts = Options::default();
    while let Some(arg) = args.pop_front() {
        match arg.as_str() {
            "-h" | "--help" => opts.help = true,
            flag if !accept.contains(&flag) && flag != "--database-url" => {
                anyhow::bail!("unexpected argument: {flag}")
            }
            "--database-url" => opts.database_url = Some(take_value(&mut args, &arg)?),
            "--id" => opts.id = Some(parse_id(&take_value(&mut args, &arg)?)?),
            "--output" => opts.output = Some(PathBuf::from(take_value(&mut args, &arg)?)),
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }
    Ok(opts)
}

fn require_id(opts: &Options) -> anyhow::Result<InfractionId> {
    opts.id
        .ok_or_else(|| anyhow::anyhow!("--id is required"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    match command.as_str() {
        "migrate" => {
            let opts = parse_options(args, &[])?;
            if opts.help {
                print_help();
                return Ok(());
            }

            let database_url = resolve_database_url(opts.database_url);
            connect_store(&database_url, 5, true).await?;
            println!("ok: migrations applied");
            Ok(())
        }
        "show" => {
            let opts = parse_options(args, &["--id"])?;
            if opts.help {
                print_help();
                return Ok(());
            }
            let id = require_id(&opts)?;

            let store = connect_store(&resolve_database_url(opts.database_url), 5, false).await?;
            let Some(record) = store.get(id).await? else {
                anyhow::bail!("infraction {id} not found");
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        "export-pdf" => {
            let opts = parse_options(args, &["--id", "--output"])?;
            if opts.help {
                print_help();
                return Ok(());
            }
            let id = require_id(&opts)?;

            let store = connect_store(&resolve_database_url(opts.database_url), 5, false).await?;
            let Some(record) = store.get(id).await? else {
                anyhow::bail!("infraction {id} not found");
            };

            let pdf = PdfExporter::new().export(&RecordView::from_record(&record))?;
            let output = opts
                .output
                .unwrap_or_else(|| PathBuf::from(download_filename(id)));
            std::fs::write(&output, &pdf)?;
            println!("ok: wrote {} ({} bytes)", output.display(), pdf.len());
            Ok(())
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {other}")
        }
    }
}
