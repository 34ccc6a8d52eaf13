//! Director/forwarder deployments across multiple engines

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use pubsub_rs::auth::{AllowAll, ConnectRequest};
use pubsub_rs::director::{Director, DirectorConfig};
use pubsub_rs::gateway::{ClientHandle, ClientIntent};
use pubsub_rs::{Engine, ForwarderConfig, ForwarderHandle, Gateway, Message};

fn forwarder_config(addr: SocketAddr, node: &str) -> ForwarderConfig {
    ForwarderConfig::new(addr)
        .node(node)
        .backoff(Duration::from_millis(10), Duration::from_millis(100))
}

async fn wait_linked(handle: &ForwarderHandle) {
    for _ in 0..200 {
        if handle.is_linked() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("forwarder never linked to the director");
}

async fn wait_unlinked(handle: &ForwarderHandle) {
    for _ in 0..200 {
        if !handle.is_linked() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("forwarder never noticed the director going away");
}

async fn subscriber(gateway: &Gateway<AllowAll>, channel: &str) -> ClientHandle {
    let client = gateway.open(ConnectRequest::new()).await.unwrap();
    client
        .handle(ClientIntent::Subscribe {
            channel: channel.to_string(),
        })
        .unwrap();
    client
}

async fn recv(client: &ClientHandle) -> Message {
    tokio::time::timeout(Duration::from_secs(2), client.next_outbound())
        .await
        .expect("timed out waiting for message")
        .expect("connection closed")
}

#[tokio::test]
async fn test_fleet_sees_one_order_per_channel() {
    let engine_a = Arc::new(Engine::new());
    let engine_b = Arc::new(Engine::new());

    let director = engine_a
        .init_director(DirectorConfig::with_addr("127.0.0.1:0".parse().unwrap()))
        .await
        .unwrap();
    let addr = director.local_addr();

    let fwd_a = engine_a
        .init_forwarder(forwarder_config(addr, "a"))
        .unwrap();
    let fwd_b = engine_b
        .init_forwarder(forwarder_config(addr, "b"))
        .unwrap();
    wait_linked(&fwd_a).await;
    wait_linked(&fwd_b).await;

    let gateway_a = Gateway::new(Arc::clone(&engine_a), AllowAll);
    let gateway_b = Gateway::new(Arc::clone(&engine_b), AllowAll);
    let sub_a = subscriber(&gateway_a, "events").await;
    let sub_b = subscriber(&gateway_b, "events").await;

    for payload in [b"m1", b"m2", b"m3"] {
        engine_a.publish("events", Bytes::from_static(payload));
    }

    // Both nodes receive the same messages with the same sequences, the
    // originator included, and exactly once each.
    for sub in [&sub_a, &sub_b] {
        for (i, payload) in [b"m1", b"m2", b"m3"].iter().enumerate() {
            let msg = recv(sub).await;
            assert_eq!(&*msg.channel, "events");
            assert_eq!(msg.sequence, (i + 1) as u64);
            assert_eq!(msg.payload, Bytes::from_static(*payload));
        }
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sub_a.connection().queue_len(), 0);
    assert_eq!(sub_b.connection().queue_len(), 0);

    // Sequencing continues across originators
    engine_b.publish("events", Bytes::from_static(b"m4"));
    for sub in [&sub_a, &sub_b] {
        let msg = recv(sub).await;
        assert_eq!(msg.sequence, 4);
        assert_eq!(msg.payload, Bytes::from_static(b"m4"));
    }

    fwd_a.shutdown().await;
    fwd_b.shutdown().await;
    director.shutdown().await;
}

#[tokio::test]
async fn test_partition_drops_traffic_then_recovers() {
    let director = Director::bind(DirectorConfig::with_addr("127.0.0.1:0".parse().unwrap()))
        .await
        .unwrap();
    let addr = director.local_addr();
    let director = director.spawn();

    let engine = Arc::new(Engine::new());
    let fwd = engine.init_forwarder(forwarder_config(addr, "solo")).unwrap();
    wait_linked(&fwd).await;

    let gateway = Gateway::new(Arc::clone(&engine), AllowAll);
    let sub = subscriber(&gateway, "events").await;

    engine.publish("events", Bytes::from_static(b"before"));
    assert_eq!(recv(&sub).await.payload, Bytes::from_static(b"before"));

    // Partition: the director goes away entirely
    director.shutdown().await;
    wait_unlinked(&fwd).await;

    engine.publish("events", Bytes::from_static(b"lost-1"));
    engine.publish("events", Bytes::from_static(b"lost-2"));
    assert!(fwd.stats().dropped_link_down >= 2);

    // Director comes back on the same address; the forwarder reconnects
    // on its own.
    let mut restarted = None;
    for _ in 0..50 {
        match Director::bind(DirectorConfig::with_addr(addr)).await {
            Ok(d) => {
                restarted = Some(d.spawn());
                break;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
    let restarted = restarted.expect("could not rebind the director address");
    wait_linked(&fwd).await;

    engine.publish("events", Bytes::from_static(b"after"));

    // Outage traffic never reappears: the next delivery is `after`
    let msg = recv(&sub).await;
    assert_eq!(msg.payload, Bytes::from_static(b"after"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sub.connection().queue_len(), 0);

    fwd.shutdown().await;
    restarted.shutdown().await;
}
