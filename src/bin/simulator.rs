use mtgn::sim::{SimEnvSensor, SimIndicator, SimLink, SimNavReceiver, SimSentence};
use mtgn::TelemetryNode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time;
use tracing::{error, info, warn};

const TCP_PORT: u16 = 8080;
const LINE_BROADCAST_BUFFER_SIZE: usize = 256;

const TICK_MS: u64 = 100;
const SENTENCE_PERIOD_MS: u64 = 200;
const SNAPSHOT_PERIOD_MS: u64 = 5_000;

// A simulated urban-canyon pass: the receiver keeps talking but loses its
// solution for five seconds.
const DROPOUT_START_MS: u64 = 20_000;
const DROPOUT_END_MS: u64 = 25_000;

const HOME_LON: f64 = -80.604_333;
const HOME_LAT: f64 = 28.608_389;
const HOME_ALT_M: f32 = 5.0;
const SIM_START_EPOCH: i64 = 1_787_356_800;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("🛰️  MTGN Telemetry Node Simulator");
    println!("=================================");

    let sensor = SimEnvSensor::default();
    let receiver = SimNavReceiver::default();
    let link = SimLink::default();

    let mut node = TelemetryNode::new(
        sensor.clone(),
        receiver.clone(),
        link.clone(),
        SimIndicator::default(),
        0,
    );
    let mut profile = FlightProfile::new(sensor, receiver);

    // Create broadcast channel for outbound serial lines
    let (line_tx, _) = broadcast::channel(LINE_BROADCAST_BUFFER_SIZE);

    // Start TCP server
    let tcp_link = link.clone();
    let tcp_line_tx = line_tx.clone();
    let tcp_server = tokio::spawn(async move {
        if let Err(e) = start_tcp_server(tcp_link, tcp_line_tx).await {
            error!("TCP server error: {}", e);
        }
    });

    // Main simulation loop; the node itself schedules transmissions, the
    // tick here only sets the control-loop granularity.
    let start = time::Instant::now();
    let mut interval = time::interval(Duration::from_millis(TICK_MS));
    let mut next_snapshot_ms = SNAPSHOT_PERIOD_MS;
    let mut last_indicator = node.state().indicator;

    loop {
        interval.tick().await;
        let now_ms = start.elapsed().as_millis() as u64;

        profile.drive(now_ms);
        if let Err(e) = node.tick(now_ms) {
            error!("❌ Node error: {}", e);
            break;
        }

        let indicator = node.state().indicator;
        if indicator != last_indicator {
            info!("💡 Indicator {:?} -> {:?}", last_indicator, indicator);
            last_indicator = indicator;
        }

        for line in link.take_sent() {
            info!("📡 {}", line.trim_end());
            if line_tx.receiver_count() > 0 {
                if let Err(e) = line_tx.send(line) {
                    warn!("Failed to broadcast line: {}", e);
                }
            }
        }

        if now_ms >= next_snapshot_ms {
            match serde_json::to_string(&node.state()) {
                Ok(snapshot) => info!("🧾 SNAPSHOT: {}", snapshot),
                Err(e) => warn!("Snapshot serialization failed: {}", e),
            }
            next_snapshot_ms += SNAPSHOT_PERIOD_MS;
        }
    }

    tcp_server.abort();
    println!("🚀 Telemetry node simulator stopped");

    Ok(())
}

/// Scripted world state: gentle environmental drift plus a receiver walking
/// a slow circle around the home point.
struct FlightProfile {
    sensor: SimEnvSensor,
    receiver: SimNavReceiver,
    next_sentence_ms: u64,
}

impl FlightProfile {
    fn new(sensor: SimEnvSensor, receiver: SimNavReceiver) -> Self {
        Self {
            sensor,
            receiver,
            next_sentence_ms: 0,
        }
    }

    /// Advance the simulated world to `now_ms`.
    fn drive(&mut self, now_ms: u64) {
        let t = now_ms as f32 / 1000.0;
        self.sensor.set_temperature_c(21.5 + 1.5 * (t / 60.0).sin());
        self.sensor.set_pressure_pa(101_320.0 - 40.0 * (t / 90.0).sin());
        self.sensor.set_humidity_pct(40.3 + 5.0 * (t / 120.0).cos());
        self.sensor.set_altitude_m(HOME_ALT_M + 2.0 * (t / 45.0).sin());

        while self.next_sentence_ms <= now_ms {
            let sentence = self.sentence_at(self.next_sentence_ms);
            self.receiver.push_sentence(sentence);
            self.next_sentence_ms += SENTENCE_PERIOD_MS;
        }
    }

    /// What the receiver would report at this point of the flight.
    fn sentence_at(&self, at_ms: u64) -> SimSentence {
        if (DROPOUT_START_MS..DROPOUT_END_MS).contains(&at_ms) {
            return SimSentence {
                dop: Some(100.0),
                satellites_in_use: Some(0),
                visible_counts: [2, 1, 1, 0, 0, 0],
                ..SimSentence::default()
            };
        }

        let t = at_ms as f64 / 1000.0;
        let angle = t / 30.0 * std::f64::consts::TAU;
        let epoch = SIM_START_EPOCH + (at_ms / 1000) as i64;

        SimSentence {
            position: Some((
                HOME_LON + 0.000_8 * angle.cos(),
                HOME_LAT + 0.000_8 * angle.sin(),
            )),
            altitude_m: Some(HOME_ALT_M + 1.5 * ((t / 40.0).sin() as f32)),
            date_time: utc_fields(epoch),
            dop: Some(0.9 + 0.4 * ((t / 7.0).sin().abs() as f32)),
            satellites_in_use: Some(7),
            visible_counts: [8, 5, 4, 3, 1, 0],
            ..SimSentence::default()
        }
    }
}

fn utc_fields(epoch_seconds: i64) -> Option<(u16, u8, u8, u8, u8, u8)> {
    use chrono::{Datelike, Timelike};
    let utc = chrono::DateTime::from_timestamp(epoch_seconds, 0)?;
    Some((
        utc.year() as u16,
        utc.month() as u8,
        utc.day() as u8,
        utc.hour() as u8,
        utc.minute() as u8,
        utc.second() as u8,
    ))
}

async fn start_tcp_server(
    link: SimLink,
    line_tx: broadcast::Sender<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", TCP_PORT)).await?;
    info!("🌐 TCP server listening on port {}", TCP_PORT);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("🔗 New client connected: {}", addr);
                let client_link = link.clone();
                let client_line_rx = line_tx.subscribe();

                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, client_link, client_line_rx).await {
                        warn!("Client {} error: {}", addr, e);
                    }
                    info!("🔌 Client {} disconnected", addr);
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_client(
    stream: TcpStream,
    link: SimLink,
    mut line_rx: broadcast::Receiver<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (reader, mut writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);

    // Spawn line streaming task; lines already carry their newline.
    let forward_task = tokio::spawn(async move {
        while let Ok(line) = line_rx.recv().await {
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                warn!("Failed to forward line: {}", e);
                break;
            }
        }
    });

    // Everything the client sends goes onto the node's serial inbound,
    // exactly as a wired link would deliver it. Replies come back through
    // the broadcast like any other outbound line.
    let mut line = String::new();
    loop {
        line.clear();
        match buf_reader.read_line(&mut line).await {
            Ok(0) => break, // Client disconnected
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                info!("📨 Inbound: {}", trimmed);
                link.inject_line(&format!("{trimmed}\n"));
            }
            Err(e) => {
                error!("Error reading from client: {}", e);
                break;
            }
        }
    }

    forward_task.abort();
    Ok(())
}
