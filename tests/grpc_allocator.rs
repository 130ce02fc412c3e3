#![cfg(feature = "transport-grpc")]

use std::sync::Arc;

use idgate::{
    AllocationError, AllocatorConfig, GrpcSegmentAllocator, InMemorySegmentAllocator,
    InMemoryWriteStore, KeyAssigningExecutor, Payload, RecordDescriptor, Row, SegmentAllocator,
    SegmentServiceImpl, WriteExecutor, WriteOperation,
};
use tokio::runtime::Runtime;

fn spawn_server(allocator: Arc<dyn SegmentAllocator>) -> (Runtime, String) {
    let rt = Runtime::new().unwrap();
    let listener = rt
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let service = SegmentServiceImpl::new(allocator).into_server();
    rt.spawn(async move {
        tonic::transport::Server::builder()
            .add_service(service)
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
    });
    (rt, format!("http://{addr}"))
}

fn config(endpoint: String) -> AllocatorConfig {
    AllocatorConfig {
        endpoint,
        ..AllocatorConfig::default()
    }
}

#[test]
fn grpc_client_allocates_from_remote_sequence() {
    let backend = Arc::new(InMemorySegmentAllocator::new().with_sequence("mall4cloud-order", 100, 1));
    let (_server, endpoint) = spawn_server(backend);

    let client = GrpcSegmentAllocator::connect(&config(endpoint)).unwrap();
    assert_eq!(client.allocate("mall4cloud-order").unwrap(), 100);
    assert_eq!(client.allocate("mall4cloud-order").unwrap(), 101);
}

#[test]
fn grpc_client_reports_rejected_tag() {
    let (_server, endpoint) = spawn_server(Arc::new(InMemorySegmentAllocator::new()));

    let client = GrpcSegmentAllocator::connect(&config(endpoint)).unwrap();
    let err = client.allocate("unknown").unwrap_err();
    assert!(matches!(err, AllocationError::Rejected { .. }));
}

#[test]
fn grpc_client_reports_exhausted_sequence() {
    let backend = Arc::new(InMemorySegmentAllocator::new().with_sequence("max", i64::MAX, 1));
    let (_server, endpoint) = spawn_server(backend);

    let client = GrpcSegmentAllocator::connect(&config(endpoint)).unwrap();
    let err = client.allocate("max").unwrap_err();
    assert_eq!(
        err,
        AllocationError::Exhausted {
            biz_tag: "max".to_string()
        }
    );
}

#[test]
fn unreachable_allocator_aborts_insert() {
    let client = GrpcSegmentAllocator::connect(&AllocatorConfig {
        endpoint: "http://127.0.0.1:1".to_string(),
        connect_timeout_ms: 200,
        request_timeout_ms: 500,
    })
    .unwrap();

    let store = Arc::new(InMemoryWriteStore::new());
    let exec = KeyAssigningExecutor::new(Arc::clone(&store), Arc::new(client));
    let layout = Arc::new(
        RecordDescriptor::builder("order")
            .id_field("order_id", "mall4cloud-order")
            .build()
            .unwrap(),
    );

    let mut op = WriteOperation::insert("OrderMapper.insert", Payload::record(Row::new(layout)));
    let err = exec.execute(&mut op).unwrap_err();
    assert!(err.is_allocation_failure());
    assert!(err.is_retryable());
    assert_eq!(store.executions(), 0);
}

#[test]
fn malformed_endpoint_is_a_config_error() {
    let err = GrpcSegmentAllocator::connect(&config("not a uri".to_string())).unwrap_err();
    assert!(matches!(err, idgate::IdGateError::Config(_)));
}

#[test]
fn grpc_client_allocates_from_inside_async_task() {
    let backend = Arc::new(InMemorySegmentAllocator::new().with_sequence("mall4cloud-order", 100, 1));
    let (_server, endpoint) = spawn_server(backend);
    let client = Arc::new(GrpcSegmentAllocator::connect(&config(endpoint)).unwrap());

    let app = Runtime::new().unwrap();
    let direct = {
        let client = Arc::clone(&client);
        app.block_on(async move { client.allocate("mall4cloud-order") })
    };
    assert_eq!(direct.unwrap(), 100);

    let spawned = {
        let client = Arc::clone(&client);
        app.block_on(async move {
            tokio::spawn(async move { client.allocate("mall4cloud-order") })
                .await
                .unwrap()
        })
    };
    assert_eq!(spawned.unwrap(), 101);
}

#[test]
fn insert_from_async_task_assigns_id() {
    let backend = Arc::new(InMemorySegmentAllocator::new().with_sequence("mall4cloud-order", 7, 1));
    let (_server, endpoint) = spawn_server(backend);
    let client = GrpcSegmentAllocator::connect(&config(endpoint)).unwrap();

    let store = Arc::new(InMemoryWriteStore::new());
    let exec = KeyAssigningExecutor::new(Arc::clone(&store), Arc::new(client));
    let layout = Arc::new(
        RecordDescriptor::builder("order")
            .id_field("order_id", "mall4cloud-order")
            .build()
            .unwrap(),
    );

    let app = Runtime::new().unwrap();
    let outcome = app.block_on(async move {
        let mut op = WriteOperation::insert("OrderMapper.insert", Payload::record(Row::new(layout)));
        let outcome = exec.execute(&mut op);
        // The executor owns the client; dropping it here drops the client runtime.
        drop(exec);
        outcome
    });
    assert_eq!(outcome.unwrap().rows_affected, 1);
    assert_eq!(store.keys("order").unwrap(), vec![7]);
}

#[test]
fn current_thread_runtime_reports_unavailable() {
    let backend = Arc::new(InMemorySegmentAllocator::new().with_sequence("mall4cloud-order", 1, 1));
    let (_server, endpoint) = spawn_server(backend);
    let client = GrpcSegmentAllocator::connect(&config(endpoint)).unwrap();

    let app = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let err = app
        .block_on(async move { client.allocate("mall4cloud-order") })
        .unwrap_err();
    assert!(matches!(err, AllocationError::Unavailable { .. }));
}
