// Property tests: no client input can end a session

mod common;

use common::{frame_message, person, FixedDetector, ChannelTransport, PERSON_LEFT_FAR};
use dronesight_server::{SessionHandler, TransportEvent, WireMessage};
use proptest::prelude::*;
use std::sync::Arc;

fn run_script(events: Vec<TransportEvent>) -> Vec<WireMessage> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let (mut transport, tx, mut rx) = ChannelTransport::pair();
        for event in events {
            tx.send(event).unwrap();
        }
        drop(tx);

        let mut session = SessionHandler::new(common::context(Arc::new(FixedDetector(person())), 1));
        session.run(&mut transport).await;
        drop(transport);

        let mut responses = Vec::new();
        while let Some(json) = rx.recv().await {
            responses.push(WireMessage::from_json(&json).unwrap());
        }
        responses
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_garbage_text_is_answered_and_survived(garbage in ".{0,256}") {
        let responses = run_script(vec![
            TransportEvent::Text(garbage),
            TransportEvent::Text(frame_message(640, 480)),
        ]);

        prop_assert_eq!(responses.len(), 2);
        prop_assert!(!responses[0].description.is_empty());
        prop_assert!(responses[0].objects.is_empty());
        prop_assert_eq!(responses[1].description.as_str(), PERSON_LEFT_FAR);
    }

    #[test]
    fn prop_garbage_base64_payload_is_answered(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let message = format!("data:image/jpeg;base64,{}", base64::encode(&bytes));
        let responses = run_script(vec![TransportEvent::Text(message)]);

        prop_assert_eq!(responses.len(), 1);
        prop_assert!(responses[0].objects.is_empty());
    }

    #[test]
    fn prop_one_response_per_data_message(binary in prop::collection::vec(any::<bool>(), 1..8)) {
        let events: Vec<TransportEvent> = binary
            .iter()
            .flat_map(|&is_binary| {
                let data = if is_binary {
                    TransportEvent::Binary(vec![1, 2, 3])
                } else {
                    TransportEvent::Text(frame_message(32, 32))
                };
                vec![TransportEvent::Ping, data]
            })
            .collect();

        let responses = run_script(events);
        prop_assert_eq!(responses.len(), binary.len());
    }
}
