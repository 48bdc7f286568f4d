use clap::{App, Arg, ArgMatches, SubCommand};
use colored::*;
use mtgn::protocol::{
    CMD_FORCE_TRANSMIT, CMD_SET_INTERVAL, COMMAND_PREFIX, DATA_PREFIX, FORCE_TRANSMIT_OPTION,
    STATUS_PREFIX,
};
use std::process::Command;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("mtgn")
        .version("0.1.0")
        .author("Field Telemetry Team")
        .about("🛰️  MTGN telemetry node console - talk to a node over its serial bridge")
        .arg(
            Arg::with_name("host")
                .short("h")
                .long("host")
                .value_name("HOST")
                .help("Bridge host address")
                .takes_value(true)
                .default_value(DEFAULT_HOST)
                .global(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Bridge port")
                .takes_value(true)
                .default_value(DEFAULT_PORT)
                .global(true),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["table", "compact", "raw"])
                .default_value("table")
                .global(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable verbose output")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("send")
                .about("📡 Force an immediate telemetry transmission")
                .long_about("Asks the node to transmit right now, bypassing its schedule, and prints the frame it sends"),
        )
        .subcommand(
            SubCommand::with_name("interval")
                .about("⏱️  Change the transmission interval")
                .arg(
                    Arg::with_name("ms")
                        .help("New interval in milliseconds (minimum 1000)")
                        .required(true)
                        .validator(|v| match v.parse::<u32>() {
                            Ok(ms) if ms >= 1000 => Ok(()),
                            Ok(_) => Err("Interval must be at least 1000 ms".into()),
                            Err(_) => Err("Interval must be a valid number".into()),
                        }),
                ),
        )
        .subcommand(
            SubCommand::with_name("monitor")
                .about("📈 Monitor the live telemetry stream")
                .long_about("Continuously prints every line the node emits, data and status alike"),
        )
        .subcommand(
            SubCommand::with_name("server")
                .about("🚀 Start the telemetry node simulator")
                .arg(
                    Arg::with_name("background")
                        .short("b")
                        .long("background")
                        .help("Run simulator in background"),
                ),
        )
        .get_matches();

    let host = matches.value_of("host").unwrap();
    let port = matches.value_of("port").unwrap().parse::<u16>()?;
    let format = matches.value_of("format").unwrap();
    let verbose = matches.is_present("verbose");

    if verbose {
        println!("{}", "🛰️  MTGN telemetry node console".bright_blue().bold());
        println!("{} {}:{}", "Connecting to".dimmed(), host, port);
    }

    match matches.subcommand() {
        ("send", _) => {
            handle_send(host, port, format, verbose).await?;
        }
        ("interval", Some(sub_matches)) => {
            handle_interval(sub_matches, host, port, format).await?;
        }
        ("monitor", _) => {
            handle_monitor(host, port, format).await?;
        }
        ("server", Some(sub_matches)) => {
            handle_server(sub_matches, port).await?;
        }
        _ => {
            println!("{}", "No command specified. Use --help for usage information.".yellow());
            println!("{}", "Quick start:".bright_green());
            println!("  {} Start the simulator", "mtgn server".bright_cyan());
            println!("  {} Monitor telemetry", "mtgn monitor".bright_cyan());
            println!("  {} Force a transmission", "mtgn send".bright_cyan());
        }
    }

    Ok(())
}

async fn handle_send(
    host: &str,
    port: u16,
    format: &str,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if verbose {
        println!("{}", "Requesting transmission...".dimmed());
    }

    let command = format!("{COMMAND_PREFIX},{CMD_FORCE_TRANSMIT},{FORCE_TRANSMIT_OPTION}\n");
    let line = exchange(host, port, &command, DATA_PREFIX).await?;

    match format {
        "raw" => print!("{}", line),
        "compact" => print_data_compact(line.trim_end()),
        _ => print_data_details(line.trim_end()),
    }

    Ok(())
}

async fn handle_interval(
    matches: &ArgMatches<'_>,
    host: &str,
    port: u16,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let ms = matches.value_of("ms").unwrap();

    let command = format!("{COMMAND_PREFIX},{CMD_SET_INTERVAL},{ms}\n");
    let expect = format!("{STATUS_PREFIX},INTERVAL");
    let ack = exchange(host, port, &command, &expect).await?;

    match format {
        "raw" => print!("{}", ack),
        "compact" => println!("{}", "OK".bright_green()),
        _ => {
            let adopted = ack.trim_end().rsplit(',').next().unwrap_or(ms);
            println!(
                "{} {} set to {} ms",
                "✅".green(),
                "Transmit interval".bright_white(),
                adopted.bright_cyan()
            );
        }
    }

    Ok(())
}

async fn handle_monitor(
    host: &str,
    port: u16,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "{}",
        "📡 Monitoring telemetry (Press Ctrl+C to stop)..."
            .bright_blue()
            .bold()
    );

    match format {
        "raw" => monitor_raw(host, port).await,
        "compact" => monitor_compact(host, port).await,
        _ => monitor_table(host, port).await,
    }
}

async fn handle_server(
    matches: &ArgMatches<'_>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let background = matches.is_present("background");

    println!(
        "{}",
        "🚀 Starting telemetry node simulator...".bright_green().bold()
    );

    let mut cmd = Command::new("cargo");
    cmd.args(&["run", "--bin", "mtgn-simulator"]);

    if background {
        cmd.spawn()?;
        println!(
            "{} Simulator started in background on port {}",
            "✅".green(),
            port
        );
    } else {
        println!(
            "{} Simulator starting on port {} (Press Ctrl+C to stop)",
            "🌐".bright_blue(),
            port
        );
        cmd.status()?;
    }

    Ok(())
}

/// Send one command line and wait for the first reply line carrying the
/// expected prefix. Everything rides the same duplex stream, so unrelated
/// telemetry lines may arrive first and are skipped.
async fn exchange(
    host: &str,
    port: u16,
    command: &str,
    expect_prefix: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", host, port);
    let stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!(
                "{} Failed to connect to telemetry node at {}",
                "❌".red(),
                addr.bright_white()
            );

            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                eprintln!("{} Simulator is not running. Start it with:", "💡".yellow());
                eprintln!("   {}", "mtgn server".bright_cyan());
                eprintln!("   or");
                eprintln!("   {}", "cargo run --bin mtgn-simulator".bright_cyan());
            } else {
                eprintln!("{} Network error: {}", "🔌".yellow(), e.to_string().bright_red());
            }

            return Err(e.into());
        }
    };

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    match tokio::time::timeout(std::time::Duration::from_secs(5), async {
        writer.write_all(command.as_bytes()).await?;

        let mut line = String::new();
        loop {
            line.clear();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Server closed connection",
                ));
            }
            if line.starts_with(expect_prefix) {
                return Ok(line.clone());
            }
        }
    })
    .await
    {
        Ok(result) => Ok(result?),
        Err(_) => {
            eprintln!("{} No matching reply within 5 seconds", "⏰".yellow());
            eprintln!(
                "{} The node may be in a terminal fault state; try 'mtgn monitor'",
                "💡".yellow()
            );
            Err("Command timeout".into())
        }
    }
}

async fn monitor_table(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let stream = TcpStream::connect((host, port)).await?;
    let mut reader = BufReader::new(stream);

    println!("{}", "┌────────────┬────────┬──────────┬───────┬─────────────┬────────────┬────────┬──────┬───────┐".bright_white());
    println!("{}", "│ Epoch      │ Temp   │ Pressure │ Hum   │ Longitude   │ Latitude   │ Alt    │ DOP  │ Sats  │".bright_white());
    println!("{}", "├────────────┼────────┼──────────┼───────┼─────────────┼────────────┼────────┼──────┼───────┤".bright_white());

    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break;
        }
        let trimmed = line.trim_end();

        if let Some(fields) = data_fields(trimmed) {
            let sats = format!("{}/{}", fields[9], fields[10]);
            println!(
                "│ {} │ {} │ {} │ {} │ {} │ {} │ {} │ {} │ {} │",
                pad_cell(fields[8], 10),
                pad_cell(fields[0], 6),
                pad_cell(fields[1], 8),
                pad_cell(fields[2], 5),
                pad_cell(fields[4], 11),
                pad_cell(fields[5], 10),
                pad_cell(fields[6], 6),
                pad_cell(fields[7], 4),
                pad_cell(&sats, 5),
            );
        } else if trimmed.starts_with(STATUS_PREFIX) {
            println!("{} {}", "⚠️ ".yellow(), trimmed.yellow());
        }
    }

    Ok(())
}

async fn monitor_compact(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let stream = TcpStream::connect((host, port)).await?;
    let mut reader = BufReader::new(stream);

    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break;
        }
        let trimmed = line.trim_end();

        if data_fields(trimmed).is_some() {
            print_data_compact(trimmed);
        } else if trimmed.starts_with(STATUS_PREFIX) {
            println!("{}", trimmed.yellow());
        }
    }

    Ok(())
}

async fn monitor_raw(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let stream = TcpStream::connect((host, port)).await?;
    let mut reader = BufReader::new(stream);

    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break;
        }
        print!("{}", line);
    }

    Ok(())
}

// Helper functions

/// The eleven comma-separated fields of a data line, or `None` when the line
/// is not a data line.
fn data_fields(line: &str) -> Option<Vec<&str>> {
    let rest = line.strip_prefix(DATA_PREFIX)?.strip_prefix(',')?;
    let fields: Vec<&str> = rest.split(',').collect();
    (fields.len() == 11).then_some(fields)
}

fn pad_cell(value: &str, width: usize) -> ColoredString {
    let padded = format!("{value:>width$}");
    if value == "NAN" {
        padded.red()
    } else {
        padded.normal()
    }
}

fn print_data_compact(line: &str) {
    let Some(fields) = data_fields(line) else {
        println!("{}", line);
        return;
    };

    let fix = fields[4] != "NAN" && fields[5] != "NAN";
    let status = if fix { "FIX  ".green() } else { "NOFIX".red() };
    println!(
        "[{}] {} | {}°C | {} hPa | DOP {} | sats {}/{}",
        fields[8], status, fields[0], fields[1], fields[7], fields[9], fields[10]
    );
}

fn print_data_details(line: &str) {
    let Some(fields) = data_fields(line) else {
        println!("{} {}", "❓".blue(), line);
        return;
    };

    let labels = [
        "Temperature °C",
        "Pressure hPa",
        "Humidity %RH",
        "Baro altitude m",
        "Longitude °",
        "Latitude °",
        "GNSS altitude m",
        "DOP",
        "Epoch s",
        "Sats in use",
        "Sats visible",
    ];

    println!("{} {}", "📡".bright_blue(), "Telemetry frame".bright_blue().bold());
    for (label, value) in labels.iter().zip(&fields) {
        let rendered = if *value == "NAN" {
            value.bright_red()
        } else {
            value.bright_cyan()
        };
        println!("  {} {}", format!("{label:<16}").bright_white(), rendered);
    }
}
