//! CloudFormation adapter acting inside a member account.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudformation::config::Region;
use aws_sdk_cloudformation::operation::create_stack::CreateStackError;
use aws_sdk_cloudformation::types::{Capability, OnFailure, Tag};
use aws_sdk_cloudformation::Client;

use lz_vending_core::{
    ServiceError, ServiceResult, StackDescription, StackEvent, StackId, StackService, StackSpec,
    TemporaryCredentials,
};

use crate::sdk::{assumed_role_credentials, service_error};

const SERVICE: &str = "cloudformation";

/// [`StackService`] that builds a CloudFormation client per call from the
/// member-account credentials and the target region.
#[derive(Debug, Clone)]
pub struct CloudFormationStacks {
    shared: SdkConfig,
}

impl CloudFormationStacks {
    /// Create an adapter; `shared` supplies HTTP, retry and timeout settings.
    #[must_use]
    pub fn new(shared: &SdkConfig) -> Self {
        Self {
            shared: shared.clone(),
        }
    }

    fn client(&self, credentials: &TemporaryCredentials, region: &str) -> Client {
        let config = aws_sdk_cloudformation::config::Builder::from(&self.shared)
            .region(Region::new(region.to_string()))
            .credentials_provider(assumed_role_credentials(credentials))
            .build();
        Client::from_conf(config)
    }
}

#[async_trait]
impl StackService for CloudFormationStacks {
    async fn create_stack(
        &self,
        credentials: &TemporaryCredentials,
        spec: &StackSpec,
    ) -> ServiceResult<StackId> {
        let tags = spec
            .tags
            .iter()
            .map(|tag| {
                Ok(Tag::builder().key(&tag.key).value(&tag.value).build())
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        let result = self
            .client(credentials, &spec.region)
            .create_stack()
            .stack_name(&spec.stack_name)
            .template_body(&spec.template_body)
            .capabilities(Capability::CapabilityNamedIam)
            .on_failure(OnFailure::Rollback)
            .set_tags(Some(tags))
            .send()
            .await;

        match result {
            Ok(output) => {
                let id = output.stack_id().unwrap_or(&spec.stack_name);
                StackId::new(id)
                    .map_err(|e| ServiceError::rejected(SERVICE, "MalformedResponse", e.to_string()))
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(CreateStackError::is_already_exists_exception) =>
            {
                Err(ServiceError::already_exists(
                    SERVICE,
                    format!("stack {} already exists", spec.stack_name),
                ))
            }
            Err(err) => Err(service_error(SERVICE, &err)),
        }
    }

    async fn describe_events(
        &self,
        credentials: &TemporaryCredentials,
        region: &str,
        stack_name: &str,
    ) -> ServiceResult<Vec<StackEvent>> {
        let output = self
            .client(credentials, region)
            .describe_stack_events()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| service_error(SERVICE, &e))?;

        Ok(output
            .stack_events()
            .iter()
            .map(|event| StackEvent {
                logical_resource_id: event.logical_resource_id().unwrap_or_default().to_string(),
                resource_type: event.resource_type().unwrap_or_default().to_string(),
                resource_status: event
                    .resource_status()
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default(),
                resource_status_reason: event.resource_status_reason().map(str::to_string),
            })
            .collect())
    }

    async fn describe_stack(
        &self,
        credentials: &TemporaryCredentials,
        region: &str,
        stack_name: &str,
    ) -> ServiceResult<StackDescription> {
        let output = self
            .client(credentials, region)
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| service_error(SERVICE, &e))?;

        let stack = output
            .stacks()
            .first()
            .ok_or_else(|| ServiceError::not_found(SERVICE, format!("stack {stack_name}")))?;

        let stack_id = StackId::new(stack.stack_id().unwrap_or(stack_name))
            .map_err(|e| ServiceError::rejected(SERVICE, "MalformedResponse", e.to_string()))?;

        Ok(StackDescription {
            stack_id,
            stack_name: stack_name.to_string(),
            outputs: stack
                .outputs()
                .iter()
                .filter_map(|o| Some((o.output_key()?.to_string(), o.output_value()?.to_string())))
                .collect(),
        })
    }
}
