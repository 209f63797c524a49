//! # Integration Tests
//!
//! Cross-crate checks:
//! - contract snapshot tests
//! - mock-radio end-to-end recording followed by offline analysis

#[cfg(test)]
mod contract_tests {
    use config_loader::ConfigLoader;
    use contracts::{SessionConfig, SinkType, DURABLE_LOG_SINK};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_default_session_is_valid() {
        let session = SessionConfig::default();
        ConfigLoader::validate(&session).unwrap();
        assert_eq!(session.decode.byte_len(), 14);
    }

    #[test]
    fn test_durable_log_leads_sink_list() {
        let content = r#"
[recording]
log_path = "out/ble_decoded.csv"

[[sinks]]
name = "trace"
sink_type = "log"
"#;
        let session = ConfigLoader::load_from_str(content, config_loader::ConfigFormat::Toml).unwrap();
        let sinks = session.all_sinks();

        assert_eq!(sinks.len(), 2);
        assert_eq!(sinks[0].name, DURABLE_LOG_SINK);
        assert_eq!(sinks[0].sink_type, SinkType::Csv);
        assert_eq!(
            sinks[0].params.get("path").map(String::as_str),
            Some("out/ble_decoded.csv")
        );
        assert_eq!(sinks[1].name, "trace");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use analysis::{LogReader, RepSegmenter, TrajectoryEstimator};
    use contracts::{
        LinkEvent, Opcode, RepDetectionConfig, Sample, SessionConfig, SinkConfig, SinkType,
        TrajectoryConfig,
    };
    use dispatcher::{create_dispatcher, DispatcherBuilder, LiveBuffers};
    use ingestion::{IngestionMetrics, NotificationHandler, PacketDecoder, PacketEncoder};
    use link::{ConnectionLifecycle, ConnectionState, MockTransport, EVENT_CAPACITY};
    use tempfile::TempDir;
    use tokio::sync::broadcast;

    const REST_PACKETS: usize = 5;
    const ACTIVE_PACKETS: usize = 20;
    const PACKET_INTERVAL: Duration = Duration::from_millis(10);

    fn motion(seq: u16, gz: f64) -> Sample {
        Sample {
            timestamp: 0.0,
            seq,
            ax: 0.0,
            ay: 0.0,
            az: 1.0,
            gx: 0.0,
            gy: 0.0,
            gz,
        }
    }

    /// End-to-end: MockTransport -> lifecycle -> handler -> dispatcher -> CSV log -> reps
    ///
    /// Two 20-packet bursts at 30 deg/s separated by rest. A malformed packet
    /// sits in the middle of the first burst and a late packet arrives after
    /// notifications are switched off.
    #[tokio::test]
    async fn test_e2e_mock_recording_to_reps() {
        let dir = TempDir::new().unwrap();
        let mut session = SessionConfig::default();
        session.recording.log_path = dir.path().join("ble_decoded.csv");
        session.link.settle_delay_ms = 0;

        // Ingestion boundary
        let decoder = Arc::new(PacketDecoder::new(&session.decode).unwrap());
        let (sample_tx, sample_rx) = async_channel::bounded(session.live.channel_capacity);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let mut events = events_tx.subscribe();
        let metrics = Arc::new(IngestionMetrics::new());
        let handler = Arc::new(
            NotificationHandler::new(decoder, sample_tx, Arc::clone(&metrics))
                .with_events(events_tx.clone()),
        );

        // Consumer side
        let live = Arc::new(LiveBuffers::new(session.live.buffer_capacity));
        let dispatcher = DispatcherBuilder::new(session.all_sinks(), sample_rx)
            .with_live_buffers(Arc::clone(&live))
            .build()
            .await
            .unwrap();
        let dispatcher_handle = dispatcher.spawn();

        // Link
        let transport = MockTransport::for_link(&session.link);
        let mut lifecycle =
            ConnectionLifecycle::new(transport.clone(), session.link.clone(), Arc::clone(&handler))
                .with_events(events_tx);
        lifecycle.connect().await.unwrap();
        lifecycle.send_command(Opcode::Start).await.unwrap();
        lifecycle.start_streaming().await.unwrap();
        assert_eq!(lifecycle.state(), ConnectionState::Streaming);

        // Device traffic
        let encoder = PacketEncoder::new(&session.decode).unwrap();
        let notify = session.link.notify_characteristic.clone();
        let phases = [
            (REST_PACKETS, 1.0),
            (ACTIVE_PACKETS, 30.0),
            (REST_PACKETS, 1.0),
            (ACTIVE_PACKETS, 30.0),
            (REST_PACKETS, 1.0),
        ];
        let mut seq: u16 = 0;
        for (phase, (count, gz)) in phases.into_iter().enumerate() {
            for i in 0..count {
                assert!(transport.inject(&notify, encoder.encode_sample(&motion(seq, gz))));
                seq += 1;
                if phase == 1 && i == ACTIVE_PACKETS / 2 {
                    assert!(transport.inject(&notify, vec![0x01, 0x02, 0x03]));
                }
                tokio::time::sleep(PACKET_INTERVAL).await;
            }
        }
        let valid_packets = seq as u64;

        // Stop, then a straggler through the old callback
        let late = handler.callback();
        lifecycle.send_command(Opcode::Stop).await.unwrap();
        lifecycle.stop_streaming().await.unwrap();
        late(encoder.encode_sample(&motion(seq, 1.0)));
        assert!(!transport.inject(&notify, encoder.encode_sample(&motion(seq, 1.0))));

        lifecycle.disconnect().await.unwrap();
        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);
        drop(lifecycle);
        handler.close();
        let report = dispatcher_handle.await.unwrap();

        // Ingestion and dispatch accounting
        let ingested = metrics.snapshot();
        assert_eq!(ingested.samples_decoded, valid_packets);
        assert_eq!(ingested.decode_errors, 1);
        assert_eq!(ingested.packets_ignored, 1);
        assert_eq!(ingested.samples_dropped, 0);
        assert_eq!(report.samples, valid_packets);
        assert_eq!(live.snapshot().total_samples, valid_packets);
        for (name, sink) in &report.sinks {
            assert_eq!(sink.written, valid_packets, "sink {name}");
            assert_eq!(sink.failed, 0, "sink {name}");
        }

        let mut decode_errors = 0;
        while let Ok(event) = events.try_recv() {
            if let LinkEvent::DecodeError { len, .. } = event {
                assert_eq!(len, 3);
                decode_errors += 1;
            }
        }
        assert_eq!(decode_errors, 1);

        let opcodes: Vec<u8> = transport.writes().into_iter().map(|(_, data)| data[0]).collect();
        assert_eq!(opcodes, vec![Opcode::Start.code(), Opcode::Stop.code()]);

        // The durable log holds every decoded sample in arrival order
        let log = std::fs::read_to_string(&session.recording.log_path).unwrap();
        let seqs: Vec<u64> = log
            .lines()
            .skip(1)
            .map(|line| line.split(',').nth(1).unwrap().parse().unwrap())
            .collect();
        assert_eq!(seqs, (0..valid_packets).collect::<Vec<_>>());

        // Offline segmentation over the same file
        let rows = LogReader::from_path(&session.recording.log_path)
            .unwrap()
            .gyro_rows()
            .unwrap();
        assert_eq!(rows.len() as u64, valid_packets);

        let segmenter = RepSegmenter::new(RepDetectionConfig {
            start_threshold: 12.0,
            stop_threshold: 6.0,
            min_rep_duration: 0.1,
        })
        .unwrap();
        let segmentation = segmenter.segment(&rows).unwrap();

        assert_eq!(segmentation.reps.len(), 2);
        assert_eq!(segmentation.rejected, 0);
        assert_eq!(segmentation.unterminated_start, None);
        let first_active = &rows[REST_PACKETS];
        assert_eq!(segmentation.reps[0].start_time, first_active.time);
        assert!(segmentation.reps.iter().all(|rep| rep.duration() >= 0.1));
        assert!(segmentation.reps[0].end_time <= segmentation.reps[1].start_time);
    }

    /// Dispatcher -> CSV log -> trajectory estimate on a closed motion
    #[tokio::test]
    async fn test_e2e_logged_motion_to_trajectory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("press.csv");
        let sinks = vec![
            SinkConfig {
                name: "press_log".to_string(),
                sink_type: SinkType::Csv,
                queue_capacity: 64,
                params: HashMap::from([("path".to_string(), path.display().to_string())]),
            },
            SinkConfig {
                name: "trace".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 64,
                params: HashMap::new(),
            },
        ];

        let (tx, rx) = async_channel::bounded(16);
        let dispatcher = create_dispatcher(sinks, rx).await.unwrap();
        let handle = dispatcher.spawn();

        // One full sine period at 100 Hz, quantized like the radio would
        let n = 201u16;
        for i in 0..n {
            let t = i as f64 * 0.01;
            let wave = (std::f64::consts::PI * t).sin();
            tx.send(Sample {
                timestamp: t,
                seq: i,
                ax: (0.2 * wave * 1000.0).round() / 1000.0,
                ay: 0.0,
                az: ((1.0 + 0.5 * wave) * 1000.0).round() / 1000.0,
                gx: 0.0,
                gy: 0.0,
                gz: 0.0,
            })
            .await
            .unwrap();
        }
        drop(tx);
        let report = handle.await.unwrap();
        assert_eq!(report.samples, n as u64);
        assert_eq!(report.sinks.len(), 2);

        let rows = LogReader::from_path(&path).unwrap().accel_rows().unwrap();
        let trajectory = TrajectoryEstimator::new(TrajectoryConfig::default())
            .unwrap()
            .estimate(&rows)
            .unwrap();

        assert_eq!(trajectory.points.len(), n as usize);
        assert!(!trajectory.exceeds_recommended_window);
        assert!((trajectory.diagnostics.bias_z - 1.0).abs() < 0.01);
        let last = trajectory.points[n as usize - 1];
        assert!(last.position_x.abs() < 0.005);
        assert!(last.position_z.abs() < 0.005);
    }
}
