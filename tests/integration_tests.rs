use mtgn::guard::FatalCondition;
use mtgn::node::*;
use mtgn::sim::*;

type SimNode = TelemetryNode<SimEnvSensor, SimNavReceiver, SimLink, SimIndicator>;

fn sim_node(boot_time_ms: u64) -> (SimNode, SimNavReceiver, SimLink) {
    let receiver = SimNavReceiver::default();
    let link = SimLink::default();
    let node = TelemetryNode::new(
        SimEnvSensor::default(),
        receiver.clone(),
        link.clone(),
        SimIndicator::default(),
        boot_time_ms,
    );
    (node, receiver, link)
}

fn fix_sentence() -> SimSentence {
    SimSentence {
        position: Some((-122.084, 37.422)),
        altitude_m: Some(12.5),
        date_time: Some((2024, 1, 1, 0, 0, 0)),
        dop: Some(1.2),
        satellites_in_use: Some(7),
        visible_counts: [4, 3, 2, 1, 1, 0],
        ..SimSentence::default()
    }
}

#[test]
fn test_node_boots_into_running_phase() {
    let (mut node, _receiver, _link) = sim_node(0);
    node.tick(0).unwrap();

    let state = node.state();
    assert_eq!(state.phase, NodePhase::Running);
    assert_eq!(state.interval_ms, 1000);
    assert_eq!(state.uptime_ms, 0);
    assert_eq!(state.stats.ticks, 1);
    assert_eq!(state.stats.lines_sent, 0);
    assert!(!state.fix_valid);
}

#[test]
fn test_exactly_one_line_per_window() {
    let (mut node, receiver, link) = sim_node(0);
    receiver.push_sentence(fix_sentence());

    let mut send_times = Vec::new();
    for t in (0..=10_000).step_by(100) {
        node.tick(t).unwrap();
        let sent = link.take_sent();
        assert!(sent.len() <= 1, "more than one line in a single tick");
        if let Some(line) = sent.first() {
            assert!(line.starts_with("$MTGNO,"));
            send_times.push(t);
        }
    }

    // One transmission per window, each window measured from the previous
    // transmission.
    assert_eq!(
        send_times,
        vec![1000, 2000, 3000, 4000, 5000, 6000, 7000, 8000, 9000, 10_000]
    );
}

#[test]
fn test_forced_send_resets_the_window() {
    let (mut node, receiver, link) = sim_node(0);
    receiver.push_sentence(fix_sentence());

    let mut send_times = Vec::new();
    for t in (0..=3500).step_by(100) {
        if t == 1500 {
            link.inject_line("$MTGNI,0,1\n");
        }
        node.tick(t).unwrap();
        if !link.take_sent().is_empty() {
            send_times.push(t);
        }
    }

    assert_eq!(send_times, vec![1000, 1500, 2500, 3500]);
    assert_eq!(node.state().transmit.forced_sends, 1);
    assert_eq!(node.state().transmit.scheduled_sends, 3);
}

#[test]
fn test_silent_receiver_goes_terminal_at_deadline() {
    let (mut node, _receiver, link) = sim_node(0);

    // Until the deadline the node transmits normally, with every GNSS field
    // sentineled.
    for t in (0..5000).step_by(1000) {
        node.tick(t).unwrap();
    }
    let before = link.take_sent();
    assert_eq!(before.len(), 4);
    assert!(before.iter().all(|line| line.starts_with("$MTGNO,")));
    assert!(before.iter().all(|line| line.contains("NAN")));

    // At the deadline the fault preempts the scheduled transmission.
    node.tick(5000).unwrap();
    assert_eq!(link.take_sent(), vec!["$MTGNS,ERR,GNSS\n"]);
    assert_eq!(node.phase(), NodePhase::Failed(FatalCondition::ReceiverSilent));

    // The announcement repeats at the transmit interval, and nothing else
    // ever goes out.
    node.tick(5900).unwrap();
    assert!(link.take_sent().is_empty());
    node.tick(6000).unwrap();
    assert_eq!(link.take_sent(), vec!["$MTGNS,ERR,GNSS\n"]);
    node.tick(7000).unwrap();
    assert_eq!(link.take_sent(), vec!["$MTGNS,ERR,GNSS\n"]);
}

#[test]
fn test_live_receiver_passes_the_deadline() {
    let (mut node, receiver, link) = sim_node(0);
    receiver.push_sentence(fix_sentence());

    for t in (0..=20_000).step_by(1000) {
        node.tick(t).unwrap();
    }

    assert_eq!(node.phase(), NodePhase::Running);
    let sent = link.take_sent();
    assert_eq!(sent.len(), 20);
    assert!(sent.iter().all(|line| line.starts_with("$MTGNO,")));
}

#[test]
fn test_liveness_check_never_rearms() {
    let (mut node, receiver, _link) = sim_node(0);
    receiver.push_sentence(fix_sentence());

    // The receiver proves itself once, then stays quiet for a minute.
    for t in (0..=60_000).step_by(1000) {
        node.tick(t).unwrap();
    }

    assert_eq!(node.phase(), NodePhase::Running);
}

#[test]
fn test_sensor_failure_is_terminal_from_boot() {
    let receiver = SimNavReceiver::default();
    let link = SimLink::default();
    let indicator = SimIndicator::default();
    let sensor = SimEnvSensor::default();
    sensor.fail_init();

    let mut node = TelemetryNode::new(sensor, receiver.clone(), link.clone(), indicator.clone(), 0);

    node.tick(0).unwrap();
    assert_eq!(link.take_sent(), vec!["$MTGNS,ERR,BME\n"]);
    assert_eq!(node.phase(), NodePhase::Failed(FatalCondition::SensorFailure));

    // Commands are dead air in a terminal phase.
    link.inject_line("$MTGNI,0,1\n");
    node.tick(500).unwrap();
    assert!(link.take_sent().is_empty());

    // Fixed one-second announcement cadence, regardless of the transmit
    // interval.
    node.tick(1000).unwrap();
    assert_eq!(link.take_sent(), vec!["$MTGNS,ERR,BME\n"]);

    // The indicator was never driven.
    assert_eq!(indicator.lines(), (false, false, false));
}

#[test]
fn test_terminal_phase_freezes_the_indicator() {
    let receiver = SimNavReceiver::default();
    let link = SimLink::default();
    let indicator = SimIndicator::default();
    let mut node = TelemetryNode::new(
        SimEnvSensor::default(),
        receiver.clone(),
        link.clone(),
        indicator.clone(),
        0,
    );

    for t in (0..5000).step_by(100) {
        node.tick(t).unwrap();
    }
    assert_eq!(indicator.lines(), (true, false, false));
    link.take_sent();

    node.tick(5000).unwrap();
    assert_eq!(node.phase(), NodePhase::Failed(FatalCondition::ReceiverSilent));
    assert_eq!(link.take_sent(), vec!["$MTGNS,ERR,GNSS\n"]);

    // Late traffic changes nothing: no drain, no indicator update.
    receiver.push_sentence(fix_sentence());
    link.inject_line("$MTGNI,0,1\n");
    node.tick(6000).unwrap();

    assert_eq!(link.take_sent(), vec!["$MTGNS,ERR,GNSS\n"]);
    assert_eq!(indicator.lines(), (true, false, false));
    assert_eq!(node.state().decoder.bytes_seen, 0);
    assert!(!node.state().fix_valid);
}

#[test]
fn test_receiver_fault_reannounces_at_configured_interval() {
    let (mut node, _receiver, link) = sim_node(0);

    link.inject_line("$MTGNI,1,2000\n");
    node.tick(100).unwrap();
    assert_eq!(link.take_sent(), vec!["$MTGNS,INTERVAL,2000\n"]);

    for t in (1000..5000).step_by(1000) {
        node.tick(t).unwrap();
    }
    link.take_sent();

    node.tick(5000).unwrap();
    assert_eq!(link.take_sent(), vec!["$MTGNS,ERR,GNSS\n"]);

    node.tick(6000).unwrap();
    assert!(link.take_sent().is_empty());
    node.tick(7000).unwrap();
    assert_eq!(link.take_sent(), vec!["$MTGNS,ERR,GNSS\n"]);
}

#[test]
fn test_data_line_shape_without_fix() {
    let (mut node, _receiver, link) = sim_node(0);

    node.tick(1000).unwrap();
    assert_eq!(
        link.take_sent(),
        vec!["$MTGNO,21.5,1013.2,40.3,0.0,NAN,NAN,NAN,NAN,NAN,NAN,NAN\n"]
    );
}

#[test]
fn test_data_line_shape_with_full_fix() {
    let (mut node, receiver, link) = sim_node(0);
    receiver.push_sentence(fix_sentence());

    node.tick(1000).unwrap();
    assert_eq!(
        link.take_sent(),
        vec!["$MTGNO,21.5,1013.2,40.3,0.0,-122.084000,37.422000,12.5,1.2,1704067200,7,11\n"]
    );
}

#[test]
fn test_dropout_scrubs_coordinates_then_recovery_restores_them() {
    let (mut node, receiver, link) = sim_node(0);
    receiver.push_sentence(fix_sentence());
    node.tick(1000).unwrap();
    link.take_sent();

    // Receiver loses its solution: boundary DOP, nothing tracked.
    receiver.push_sentence(SimSentence {
        dop: Some(100.0),
        satellites_in_use: Some(0),
        visible_counts: [2, 1, 1, 0, 0, 0],
        ..SimSentence::default()
    });
    node.tick(2000).unwrap();
    assert_eq!(
        link.take_sent(),
        vec!["$MTGNO,21.5,1013.2,40.3,0.0,NAN,NAN,NAN,100.0,1704067200,0,4\n"]
    );

    // A fresh position report brings the coordinates back.
    receiver.push_sentence(SimSentence {
        position: Some((-122.1, 37.5)),
        dop: Some(1.5),
        satellites_in_use: Some(8),
        visible_counts: [5, 4, 0, 0, 0, 0],
        ..SimSentence::default()
    });
    node.tick(3000).unwrap();
    assert_eq!(
        link.take_sent(),
        vec!["$MTGNO,21.5,1013.2,40.3,0.0,-122.100000,37.500000,12.5,1.5,1704067200,8,9\n"]
    );
}

#[test]
fn test_environment_readings_track_the_sensor() {
    let receiver = SimNavReceiver::default();
    let link = SimLink::default();
    let sensor = SimEnvSensor::default();
    let mut node = TelemetryNode::new(
        sensor.clone(),
        receiver.clone(),
        link.clone(),
        SimIndicator::default(),
        0,
    );

    sensor.set_temperature_c(-5.3);
    sensor.set_pressure_pa(98_000.0);
    sensor.set_humidity_pct(72.6);
    sensor.set_altitude_m(287.9);

    node.tick(1000).unwrap();
    assert_eq!(
        link.take_sent(),
        vec!["$MTGNO,-5.3,980.0,72.6,287.9,NAN,NAN,NAN,NAN,NAN,NAN,NAN\n"]
    );
}

#[test]
fn test_boot_time_anchors_schedule_and_uptime() {
    let (mut node, _receiver, link) = sim_node(10_000);

    node.tick(10_100).unwrap();
    assert!(link.take_sent().is_empty());
    assert_eq!(node.state().uptime_ms, 100);

    node.tick(11_000).unwrap();
    assert_eq!(link.take_sent().len(), 1);
    assert_eq!(node.state().transmit.scheduled_sends, 1);
    assert_eq!(node.state().stats.ticks, 2);
    assert_eq!(node.state().stats.lines_sent, 1);
}

#[test]
fn test_state_snapshot_serializes_to_json() {
    let (mut node, receiver, _link) = sim_node(0);
    receiver.push_sentence(fix_sentence());
    node.tick(1000).unwrap();

    let json = serde_json::to_string(&node.state()).unwrap();
    assert!(json.contains("\"phase\""));
    assert!(json.contains("\"interval_ms\""));
    assert!(json.contains("\"fix_valid\":true"));
}
