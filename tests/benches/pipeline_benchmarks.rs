//! # ODIM Pipeline Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | Task event decode (two JSON passes) | < 10µs per message |
//! | Context inbound → outbound | < 5µs per hop |
//! | Response rewrite (value body) | < 10µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use shared_bus::BusMessage;
use shared_types::context::keys;
use shared_types::{rewrite, Events, Metadata, RequestContext, ResponseEnvelope, TaskEvent};
use svc_task::decode;

fn task_message(payload_entries: usize) -> BusMessage {
    let mut event = TaskEvent::new("task85de4003-8757-4c7d-942f-55eaf7d6812a", "OK");
    event.task_state = Some("Running".to_string());
    event.percent_complete = Some(50);
    event.payload = Some(json!({
        "HttpOperation": "POST",
        "TargetUri": "/redfish/v1/Systems",
        "Members": (0..payload_entries)
            .map(|n| json!({ "@odata.id": format!("/redfish/v1/Systems/{n}") }))
            .collect::<Vec<_>>(),
    }));
    BusMessage::json(&Events::wrap(&event).expect("serializable")).expect("serializable")
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("svc-task-decode");

    for entries in [0usize, 16, 256] {
        let message = task_message(entries);
        let size = message.to_bytes().map(|b| b.len()).unwrap_or_default();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entries), &message, |b, m| {
            b.iter(|| decode(black_box(m)))
        });
    }

    group.finish();
}

fn bench_context_hop(c: &mut Criterion) {
    let inbound: Metadata = [
        (keys::TRANSACTION_ID, "3bd1f589-117a-4cf9-89f2-da44ee8e012b"),
        (keys::ACTION_ID, "205"),
        (keys::ACTION_NAME, "GetManager"),
        (keys::THREAD_ID, "0"),
        (keys::THREAD_NAME, "api"),
        (keys::PROCESS_NAME, "api-0"),
    ]
    .into_iter()
    .collect();

    c.bench_function("context-inbound-outbound", |b| {
        b.iter(|| RequestContext::from_inbound(black_box(&inbound)).to_outbound())
    });
}

fn bench_rewrite(c: &mut Criterion) {
    c.bench_function("response-rewrite", |b| {
        b.iter(|| {
            rewrite(black_box(ResponseEnvelope::failed_dependency_call(
                "database connection refused",
            )))
        })
    });
}

criterion_group!(benches, bench_decode, bench_context_hop, bench_rewrite);
criterion_main!(benches);
