// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common test utilities for integration tests.

use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::TXT;
use hickory_proto::rr::{RData, Record};
use std::net::SocketAddr;
use zonesync::config::Settings;

/// Spawn a minimal UDP DNS responder answering every TXT query with the
/// given payload. Returns the socket address to configure as the
/// topology resolver.
pub async fn spawn_txt_responder(payload: &str) -> SocketAddr {
    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("bind responder socket");
    let addr = socket.local_addr().expect("responder address");
    let payload = payload.to_string();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let Ok(query) = Message::from_vec(&buf[..len]) else {
                continue;
            };

            let mut response = Message::new();
            response
                .set_id(query.id())
                .set_message_type(MessageType::Response)
                .set_op_code(OpCode::Query)
                .set_response_code(ResponseCode::NoError)
                .set_recursion_desired(query.recursion_desired())
                .set_recursion_available(true);

            for q in query.queries() {
                response.add_query(q.clone());
                response.add_answer(Record::from_rdata(
                    q.name().clone(),
                    300,
                    RData::TXT(TXT::new(vec![payload.clone()])),
                ));
            }

            if let Ok(bytes) = response.to_vec() {
                let _ = socket.send_to(&bytes, peer).await;
            }
        }
    });

    addr
}

/// Build settings wired to the test servers.
pub fn make_settings(
    resolver: SocketAddr,
    directory_url: &str,
    zone_url: &str,
    output_path: &std::path::Path,
) -> Settings {
    serde_yaml::from_str(&format!(
        r"
domain: example.com
topology:
  source: topology.example.com
  resolver: {resolver}
directory:
  api_url: {directory_url}
  api_token: token-a
zone:
  api_url: {zone_url}
  api_token: token-z
monitoring:
  output_path: {}
",
        output_path.display()
    ))
    .expect("settings should parse")
}
