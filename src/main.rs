// Main CLI entry point for sqlprobe
// Uses clap for argument parsing and prints scan events as a live trace

use clap::{Arg, ArgAction, Command};
use sqlprobe::config::{ScanConfig, ScheduleEntry};
use sqlprobe::dictionary::{discover, DictionaryRef};
use sqlprobe::events::{ScanEvent, Subscription};
use sqlprobe::logging::initialize_logging;
use sqlprobe::models::{Method, RequestTemplate};
use sqlprobe::params::parse_key_value_string;
use sqlprobe::priming::{DefaultHeaders, HeaderPrimer, StaticHeaders};
use sqlprobe::reporting::{export_csv, export_markdown};
use sqlprobe::session::ScanSession;
use std::path::PathBuf;
use tracing::{error, info};

fn cli() -> Command {
    Command::new("sqlprobe")
        .version(clap::crate_version!())
        .author("Jake Abendroth")
        .about("Timing-based SQL injection probing for HTTP endpoints")
        .after_help("EXAMPLES:\n  sqlprobe --url http://localhost:3000/api/products --params q:shoes,page:1\n  sqlprobe -u http://api/login -m POST --body username:admin,password:x -D error-based -D time-based --delay-ms 20\n  sqlprobe --list-dictionaries")
        .arg(Arg::new("url")
            .short('u')
            .long("url")
            .num_args(1)
            .required_unless_present("list_dictionaries")
            .help("Target URL"))
        .arg(Arg::new("method")
            .short('m')
            .long("method")
            .num_args(1)
            .default_value("GET")
            .help("HTTP method"))
        .arg(Arg::new("params")
            .short('p')
            .long("params")
            .num_args(1)
            .default_value("")
            .help("Query parameters as key:value,key:value"))
        .arg(Arg::new("body")
            .short('d')
            .long("body")
            .num_args(1)
            .default_value("")
            .help("Body fields as key:value,key:value"))
        .arg(Arg::new("headers")
            .short('H')
            .long("headers")
            .num_args(1)
            .default_value("")
            .help("Request headers as key:value,key:value"))
        .arg(Arg::new("session_id")
            .short('s')
            .long("session-id")
            .num_args(1)
            .default_value("client-id")
            .help("Session id, used to isolate log files"))
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .num_args(1)
            .help("JSON configuration file"))
        .arg(Arg::new("dictionary")
            .short('D')
            .long("dictionary")
            .action(ArgAction::Append)
            .help("Dictionary category or file to run (repeatable, replaces the schedule)"))
        .arg(Arg::new("dictionary_dir")
            .long("dictionary-dir")
            .num_args(1)
            .help("Directory holding the bundled dictionaries"))
        .arg(Arg::new("output_dir")
            .short('o')
            .long("output-dir")
            .num_args(1)
            .help("Directory for audit logs, samples and reports"))
        .arg(Arg::new("delay_ms")
            .long("delay-ms")
            .num_args(1)
            .value_parser(clap::value_parser!(u64))
            .help("Delay between requests in milliseconds"))
        .arg(Arg::new("dictionary_pause_ms")
            .long("dictionary-pause-ms")
            .num_args(1)
            .value_parser(clap::value_parser!(u64))
            .help("Pause between dictionaries in milliseconds"))
        .arg(Arg::new("timeout_ms")
            .long("timeout-ms")
            .num_args(1)
            .value_parser(clap::value_parser!(u64))
            .help("Per-request timeout in milliseconds"))
        .arg(Arg::new("proxy")
            .long("proxy")
            .num_args(1)
            .help("Send probe traffic through this proxy URL"))
        .arg(Arg::new("json_events")
            .long("json-events")
            .action(ArgAction::SetTrue)
            .help("Print events as JSON lines instead of trace lines"))
        .arg(Arg::new("csv_report")
            .long("csv-report")
            .action(ArgAction::SetTrue)
            .help("Write a CSV report of the hits"))
        .arg(Arg::new("markdown_report")
            .long("markdown-report")
            .action(ArgAction::SetTrue)
            .help("Write a Markdown report of the verdict and hits"))
        .arg(Arg::new("list_dictionaries")
            .long("list-dictionaries")
            .action(ArgAction::SetTrue)
            .help("List the dictionaries found in the dictionary directory and exit"))
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::SetTrue)
            .help("Debug logging"))
}

fn build_config(matches: &clap::ArgMatches) -> Result<ScanConfig, sqlprobe::ProbeError> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ScanConfig::load(&PathBuf::from(path))?,
        None => ScanConfig::default(),
    };
    if let Some(dir) = matches.get_one::<String>("dictionary_dir") {
        config.dictionary_dir = PathBuf::from(dir);
    }
    if let Some(dir) = matches.get_one::<String>("output_dir") {
        config.output_dir = PathBuf::from(dir);
    }
    if let Some(ms) = matches.get_one::<u64>("delay_ms") {
        config.request_delay_ms = *ms;
    }
    if let Some(ms) = matches.get_one::<u64>("dictionary_pause_ms") {
        config.dictionary_pause_ms = *ms;
    }
    if let Some(ms) = matches.get_one::<u64>("timeout_ms") {
        config.request_timeout_ms = *ms;
    }
    if let Some(proxy) = matches.get_one::<String>("proxy") {
        config.proxy = Some(proxy.clone());
    }
    if let Some(dictionaries) = matches.get_many::<String>("dictionary") {
        let mut schedule = Vec::new();
        for (i, name) in dictionaries.enumerate() {
            let reference: DictionaryRef = name.parse()?;
            schedule.push(if i == 0 {
                ScheduleEntry::immediate(reference)
            } else {
                ScheduleEntry::new(reference)
            });
        }
        config.schedule = schedule;
    }
    config.validate()?;
    Ok(config)
}

/// Console transport: prints every event until the session drops its channel.
async fn print_events(mut events: Subscription, json: bool) {
    while let Some(event) = events.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("cannot serialise event: {}", e),
            }
            continue;
        }
        if let ScanEvent::SqlInjectionProgress { process, percent, .. } = &event {
            println!("[{} {:.2}%]", process, percent);
        }
        let (request, response) = event.trace_lines();
        println!("{}", request);
        if !response.is_empty() {
            println!("{}", response);
        }
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    if let Err(e) = initialize_logging(matches.get_flag("verbose")) {
        eprintln!("{}", e);
    }

    let config = build_config(&matches).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(2);
    });

    if matches.get_flag("list_dictionaries") {
        for dictionary in discover(&config.dictionary_dir) {
            println!("{}\t{}", dictionary.name, dictionary.path.display());
        }
        return;
    }

    let url = matches.get_one::<String>("url").cloned().unwrap_or_default();
    let method: Method = matches
        .get_one::<String>("method")
        .map(|m| m.parse::<Method>())
        .unwrap_or(Ok(Method::GET))
        .unwrap_or_else(|e| {
            error!("{}", e);
            std::process::exit(2);
        });
    let param_arg = |name: &str| {
        parse_key_value_string(matches.get_one::<String>(name).map(|s| s.as_str()).unwrap_or(""))
    };
    let template = RequestTemplate {
        url,
        method,
        params: param_arg("params"),
        body: param_arg("body"),
    };
    let headers = param_arg("headers");
    let session_id = matches
        .get_one::<String>("session_id")
        .cloned()
        .unwrap_or_else(|| "client-id".to_string());

    let primer: Box<dyn HeaderPrimer> = if headers.is_empty() {
        Box::new(DefaultHeaders { user_agent: config.user_agent.clone() })
    } else {
        let mut primer = StaticHeaders::new(headers);
        primer.user_agent = config.user_agent.clone();
        Box::new(primer)
    };

    let report_dir = config.output_dir.clone();
    let session = ScanSession::new(session_id, template, config).with_primer(primer);
    let printer = tokio::spawn(print_events(session.subscribe(), matches.get_flag("json_events")));

    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current request");
            cancel.cancel();
        }
    });

    let result = session.run().await;
    let _ = printer.await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!("scan failed: {}", e);
            std::process::exit(1);
        }
    };

    for failed in &report.failed_passes {
        println!("Skipped dictionary {}: {}", failed.dictionary, failed.error);
    }
    println!(
        "Grade {} ({}) from {} samples. Audit log: {}. Samples: {}.",
        report.verdict.grade,
        report
            .verdict
            .percentage
            .map(|p| format!("{:.2}%", p))
            .unwrap_or_else(|| "n/a".to_string()),
        report.hits.len(),
        report.audit_log.display(),
        report.samples_path.display()
    );

    if matches.get_flag("csv_report") {
        match export_csv(&report.hits, &report_dir) {
            Ok(path) => println!("CSV report: {}", path.display()),
            Err(e) => error!("CSV export failed: {}", e),
        }
    }
    if matches.get_flag("markdown_report") {
        match export_markdown(&report.verdict, &report.hits, &report_dir) {
            Ok(path) => println!("Markdown report: {}", path.display()),
            Err(e) => error!("Markdown export failed: {}", e),
        }
    }
}
