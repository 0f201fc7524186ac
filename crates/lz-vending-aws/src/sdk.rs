//! Shared SDK configuration and error translation.

use std::time::SystemTime;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

use lz_vending_core::{ServiceError, TemporaryCredentials};

/// Provider name attached to credentials built from an assumed role.
const ASSUMED_ROLE_PROVIDER: &str = "lz-vending-assumed-role";

/// Modeled error codes that mean "slow down" rather than "no".
const THROTTLING_CODES: [&str; 8] = [
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "RequestThrottledException",
    "SlowDown",
];

/// Load the management-account SDK configuration from the environment.
///
/// `region` overrides the region resolved from the environment when set.
pub async fn load_shared_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}

/// Translate an SDK failure into a [`ServiceError`].
///
/// Modeled service errors become `Rejected` with their error code, except
/// throttling codes and server-side faults (5xx), which become `Unavailable`
/// along with anything that never produced a response (dispatch, timeout,
/// unparseable reply). Polling loops retry `Unavailable` in place.
pub(crate) fn service_error<E>(service: &str, err: &SdkError<E, HttpResponse>) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let Some(inner) = err.as_service_error() else {
        return ServiceError::unavailable(service, DisplayErrorContext(err).to_string());
    };

    let code = inner.code().unwrap_or("Unknown");
    let message = inner
        .message()
        .map_or_else(|| inner.to_string(), ToString::to_string);
    let server_fault = err
        .raw_response()
        .is_some_and(|response| response.status().is_server_error());

    if server_fault || THROTTLING_CODES.contains(&code) {
        ServiceError::unavailable(service, format!("{code}: {message}"))
    } else {
        ServiceError::rejected(service, code, message)
    }
}

/// Static credentials for a client acting inside a member account.
pub(crate) fn assumed_role_credentials(
    credentials: &TemporaryCredentials,
) -> aws_sdk_sts::config::Credentials {
    aws_sdk_sts::config::Credentials::new(
        credentials.access_key_id.clone(),
        credentials.secret_access_key.clone(),
        Some(credentials.session_token.clone()),
        credentials.expiration.map(SystemTime::from),
        ASSUMED_ROLE_PROVIDER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_organizations::operation::describe_create_account_status::DescribeCreateAccountStatusError;
    use aws_smithy_runtime_api::http::StatusCode;
    use aws_smithy_types::body::SdkBody;
    use aws_smithy_types::error::ErrorMetadata;

    fn modeled(code: &str, status: u16) -> SdkError<DescribeCreateAccountStatusError, HttpResponse> {
        let metadata = ErrorMetadata::builder().code(code).message("details").build();
        SdkError::service_error(
            DescribeCreateAccountStatusError::generic(metadata),
            HttpResponse::new(StatusCode::try_from(status).unwrap(), SdkBody::empty()),
        )
    }

    #[test]
    fn throttling_is_transient() {
        for code in ["TooManyRequestsException", "ThrottlingException", "Throttling"] {
            let err = service_error("organizations", &modeled(code, 400));
            assert!(
                matches!(err, ServiceError::Unavailable { .. }),
                "{code} classified as {err:?}"
            );
        }
    }

    #[test]
    fn server_faults_are_transient() {
        let err = service_error("organizations", &modeled("ServiceException", 500));
        assert!(matches!(err, ServiceError::Unavailable { .. }));
    }

    #[test]
    fn client_faults_are_rejections() {
        let err = service_error("organizations", &modeled("AccessDeniedException", 403));
        assert_eq!(
            err,
            ServiceError::rejected("organizations", "AccessDeniedException", "details")
        );
    }

    #[test]
    fn timeouts_are_transient() {
        let err: SdkError<DescribeCreateAccountStatusError, HttpResponse> =
            SdkError::timeout_error("no response");
        assert!(matches!(
            service_error("organizations", &err),
            ServiceError::Unavailable { .. }
        ));
    }
}
