//! gRPC transport for the segment allocator.
//!
//! [`GrpcSegmentAllocator`] is the blocking client used on the write path;
//! it owns a small tokio runtime and drives tonic calls to completion.
//! Calls made from inside a multi-thread tokio runtime are moved off the
//! async worker with `block_in_place`; a current-thread runtime cannot
//! block, so allocation there fails as [`AllocationError::Unavailable`].
//! [`SegmentServiceImpl`] exposes any [`SegmentAllocator`] over the same
//! protocol.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Response, Status};

use crate::config::AllocatorConfig;
use crate::error::{AllocationError, ConfigError, IdGateError, IdGateResult};

use super::SegmentAllocator;

/// Messages and stubs generated from `proto/segment.proto`.
#[allow(missing_docs)]
pub mod proto {
    tonic::include_proto!("idgate.segment");
}

use proto::segment_service_client::SegmentServiceClient;
use proto::segment_service_server::{SegmentService, SegmentServiceServer};

/// Response code for an exhausted sequence.
pub const EXHAUSTED_CODE: &str = "sequence_exhausted";

/// Blocking gRPC client for a remote segment allocator.
pub struct GrpcSegmentAllocator {
    // Always `Some` until dropped.
    runtime: Option<Runtime>,
    client: SegmentServiceClient<Channel>,
}

impl std::fmt::Debug for GrpcSegmentAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcSegmentAllocator").finish_non_exhaustive()
    }
}

impl GrpcSegmentAllocator {
    /// Builds a client for `config.endpoint`.
    ///
    /// The connection is established lazily on the first allocation, so an
    /// unreachable allocator surfaces as [`AllocationError::Unavailable`].
    ///
    /// # Errors
    /// Returns a config error for a malformed endpoint, or an internal error
    /// if the runtime cannot be started.
    pub fn connect(config: &AllocatorConfig) -> IdGateResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("idgate-allocator")
            .enable_all()
            .build()
            .map_err(|e| IdGateError::internal(format!("failed to start allocator runtime: {e}")))?;

        let endpoint = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|e| ConfigError::Invalid {
                reason: format!("invalid allocator endpoint '{}': {e}", config.endpoint),
            })?
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms));

        let channel = {
            let _guard = runtime.enter();
            endpoint.connect_lazy()
        };

        Ok(Self {
            runtime: Some(runtime),
            client: SegmentServiceClient::new(channel),
        })
    }

    /// Drives `fut` to completion on the client runtime.
    ///
    /// Returns `None` when the calling thread cannot block.
    fn block_on<F: Future>(&self, fut: F) -> Option<F::Output> {
        let runtime = self.runtime.as_ref()?;
        match Handle::try_current() {
            Err(_) => Some(runtime.block_on(fut)),
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                Some(tokio::task::block_in_place(|| runtime.block_on(fut)))
            }
            Ok(_) => None,
        }
    }
}

impl Drop for GrpcSegmentAllocator {
    fn drop(&mut self) {
        // A runtime cannot be dropped where blocking is not allowed.
        if let Some(runtime) = self.runtime.take() {
            if Handle::try_current().is_ok() {
                runtime.shutdown_background();
            }
        }
    }
}

fn is_transient(code: Code) -> bool {
    matches!(
        code,
        Code::Unavailable
            | Code::DeadlineExceeded
            | Code::Cancelled
            | Code::Unknown
            | Code::ResourceExhausted
            | Code::Aborted
    )
}

impl SegmentAllocator for GrpcSegmentAllocator {
    fn allocate(&self, biz_tag: &str) -> Result<i64, AllocationError> {
        let mut client = self.client.clone();
        let request = proto::GetSegmentIdRequest {
            biz_tag: biz_tag.to_string(),
        };

        let Some(result) = self.block_on(client.get_segment_id(request)) else {
            return Err(AllocationError::Unavailable {
                biz_tag: biz_tag.to_string(),
                message: "cannot block on a current-thread tokio runtime".to_string(),
            });
        };

        let response = result
            .map_err(|status| {
                if is_transient(status.code()) {
                    AllocationError::Unavailable {
                        biz_tag: biz_tag.to_string(),
                        message: status.message().to_string(),
                    }
                } else {
                    AllocationError::Rejected {
                        biz_tag: biz_tag.to_string(),
                        code: format!("{:?}", status.code()),
                        message: status.message().to_string(),
                    }
                }
            })?
            .into_inner();

        if response.success {
            Ok(response.id)
        } else if response.code == EXHAUSTED_CODE {
            Err(AllocationError::Exhausted {
                biz_tag: biz_tag.to_string(),
            })
        } else {
            Err(AllocationError::Rejected {
                biz_tag: biz_tag.to_string(),
                code: response.code,
                message: response.message,
            })
        }
    }
}

/// gRPC service serving ids from a local [`SegmentAllocator`].
pub struct SegmentServiceImpl {
    allocator: Arc<dyn SegmentAllocator>,
}

impl SegmentServiceImpl {
    /// Serves ids drawn from `allocator`.
    #[must_use]
    pub fn new(allocator: Arc<dyn SegmentAllocator>) -> Self {
        Self { allocator }
    }

    /// Wraps the service for registration with a tonic `Server`.
    #[must_use]
    pub fn into_server(self) -> SegmentServiceServer<Self> {
        SegmentServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl SegmentService for SegmentServiceImpl {
    async fn get_segment_id(
        &self,
        request: Request<proto::GetSegmentIdRequest>,
    ) -> Result<Response<proto::GetSegmentIdResponse>, Status> {
        let biz_tag = request.into_inner().biz_tag;
        if biz_tag.is_empty() {
            return Err(Status::invalid_argument("biz_tag is required"));
        }

        let allocator = Arc::clone(&self.allocator);
        let result = tokio::task::spawn_blocking(move || allocator.allocate(&biz_tag))
            .await
            .map_err(|e| Status::internal(format!("allocation task failed: {e}")))?;

        let reply = match result {
            Ok(id) => proto::GetSegmentIdResponse {
                success: true,
                id,
                code: String::new(),
                message: String::new(),
            },
            Err(AllocationError::Rejected { code, message, .. }) => proto::GetSegmentIdResponse {
                success: false,
                id: 0,
                code,
                message,
            },
            Err(AllocationError::Exhausted { .. }) => proto::GetSegmentIdResponse {
                success: false,
                id: 0,
                code: EXHAUSTED_CODE.to_string(),
                message: "sequence exhausted".to_string(),
            },
            Err(AllocationError::Unavailable { message, .. }) => {
                return Err(Status::unavailable(message));
            }
        };
        Ok(Response::new(reply))
    }
}
