//! In-memory collaborators for saga integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use lz_vending_core::{
    AccountId, AccountRequest, AliasService, BillingAccess, BlobStore, CreateAccountRequestId,
    CreateAccountState, CreateAccountStatus, IdentityBroker, OrganizationApi, OrganizationalUnit,
    OrganizationalUnitId, PolicyId, PolicyStore, PolicyWrite, RootId, ServiceError,
    ServiceResult, StackDescription, StackEvent, StackId, StackService, StackSpec,
    TemporaryCredentials, TrustPolicyDocument, VersionedPolicy, DEFAULT_CLAUSE_SID,
};
use lz_vending_service::config::BootstrapConfig;
use lz_vending_service::{Collaborators, ProvisioningConfig, Provisioner};
use lz_vending_store::MemoryInventory;

pub const ACCOUNT_ID: &str = "111111111111";
pub const EXISTING_ADMITTED: &str = "222222222222";
pub const METADATA_BUCKET: &str = "lz-metadata";
pub const TEMPLATE_BUCKET: &str = "lz-templates";
pub const TEMPLATE_KEY: &str = "baseline.yaml";
pub const STACK_NAME: &str = "lz-baseline";
pub const STACK_REGION: &str = "cn-north-1";
pub const STACK_ID: &str = "arn:aws-cn:cloudformation:cn-north-1:111111111111:stack/lz-baseline/1";

pub fn account_id() -> AccountId {
    ACCOUNT_ID.parse().unwrap()
}

pub fn config() -> ProvisioningConfig {
    ProvisioningConfig::new(
        "OrganizationAccountAccessRole",
        METADATA_BUCKET,
        BootstrapConfig {
            template_bucket: TEMPLATE_BUCKET.into(),
            template_key: TEMPLATE_KEY.into(),
            stack_name: STACK_NAME.into(),
            stack_region: STACK_REGION.into(),
        },
    )
}

pub fn team_a() -> AccountRequest {
    AccountRequest::new("team-a", "team-a@x.test")
}

// ============================================================================
// Organization
// ============================================================================

#[derive(Debug)]
pub struct OrgState {
    pub reject_submission: Option<ServiceError>,
    pub statuses: VecDeque<CreateAccountState>,
    /// Errors returned by the next status polls, ahead of `statuses`.
    pub describe_errors: VecDeque<ServiceError>,
    pub failure_reason: Option<String>,
    pub units: Vec<OrganizationalUnit>,
    pub move_error: Option<ServiceError>,
    pub attach_error: Option<ServiceError>,
    pub submissions: Vec<(String, String, BillingAccess)>,
    pub describe_calls: u32,
    pub list_calls: u32,
    pub moved: Vec<(AccountId, OrganizationalUnitId)>,
    pub attached: Vec<(PolicyId, AccountId)>,
}

/// Organization that reports `IN_PROGRESS` twice, then `SUCCEEDED`.
pub struct FakeOrganization {
    pub state: Mutex<OrgState>,
}

pub fn unit(id: &str, name: &str) -> OrganizationalUnit {
    OrganizationalUnit {
        id: OrganizationalUnitId::new(id).unwrap(),
        name: name.into(),
    }
}

impl FakeOrganization {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(OrgState {
                reject_submission: None,
                statuses: VecDeque::from([
                    CreateAccountState::InProgress,
                    CreateAccountState::InProgress,
                    CreateAccountState::Succeeded,
                ]),
                describe_errors: VecDeque::new(),
                failure_reason: None,
                units: vec![unit("ou-sbx1-aaaa", "Sandbox"), unit("ou-prd1-bbbb", "Prod")],
                move_error: None,
                attach_error: None,
                submissions: Vec::new(),
                describe_calls: 0,
                list_calls: 0,
                moved: Vec::new(),
                attached: Vec::new(),
            }),
        }
    }

    pub fn with<F: FnOnce(&mut OrgState)>(self, f: F) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn snapshot<T>(&self, f: impl FnOnce(&OrgState) -> T) -> T {
        f(&self.state.lock().unwrap())
    }

    fn status(&self, state: CreateAccountState, failure_reason: Option<String>) -> CreateAccountStatus {
        CreateAccountStatus {
            request_id: CreateAccountRequestId::new("car-0123456789").unwrap(),
            state,
            account_id: (state == CreateAccountState::Succeeded).then(account_id),
            failure_reason,
        }
    }
}

#[async_trait]
impl OrganizationApi for FakeOrganization {
    async fn create_account(
        &self,
        request: &AccountRequest,
        role_name: &str,
        billing_access: BillingAccess,
    ) -> ServiceResult<CreateAccountStatus> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.reject_submission.clone() {
            return Err(err);
        }
        state
            .submissions
            .push((request.name.clone(), role_name.to_string(), billing_access));
        Ok(self.status(CreateAccountState::InProgress, None))
    }

    async fn describe_create_account(
        &self,
        _request_id: &CreateAccountRequestId,
    ) -> ServiceResult<CreateAccountStatus> {
        let mut state = self.state.lock().unwrap();
        state.describe_calls += 1;
        if let Some(err) = state.describe_errors.pop_front() {
            return Err(err);
        }
        let next = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().copied()
        }
        .unwrap_or(CreateAccountState::InProgress);
        let reason = state.failure_reason.clone();
        Ok(self.status(next, reason))
    }

    async fn root_id(&self) -> ServiceResult<RootId> {
        Ok(RootId::new("r-root").unwrap())
    }

    async fn list_units(&self, _parent: &RootId) -> ServiceResult<Vec<OrganizationalUnit>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        Ok(state.units.clone())
    }

    async fn move_account(
        &self,
        account_id: &AccountId,
        _from: &RootId,
        to: &OrganizationalUnitId,
    ) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.move_error.clone() {
            return Err(err);
        }
        state.moved.push((account_id.clone(), to.clone()));
        Ok(())
    }

    async fn attach_policy(&self, policy_id: &PolicyId, target: &AccountId) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.attach_error.clone() {
            return Err(err);
        }
        state.attached.push((policy_id.clone(), target.clone()));
        Ok(())
    }
}

// ============================================================================
// Trust-boundary policy
// ============================================================================

pub fn trust_policy(admitted: &serde_json::Value) -> TrustPolicyDocument {
    TrustPolicyDocument::from_value(json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": DEFAULT_CLAUSE_SID,
            "Effect": "Deny",
            "Principal": "*",
            "Action": "s3:GetObject",
            "Resource": "arn:aws-cn:s3:::lz-metadata/*",
            "Condition": { "StringEquals": { "aws:PrincipalAccount": admitted } }
        }]
    }))
    .unwrap()
}

#[derive(Debug)]
pub struct PolicyState {
    pub document: TrustPolicyDocument,
    pub version: u64,
    pub writes: u32,
    pub lockout_acknowledged: Vec<bool>,
    /// Accounts another writer admits just before each of our next writes lands.
    pub concurrent_admissions: VecDeque<String>,
}

/// Versioned policy store that can simulate concurrent writers.
pub struct FakePolicyStore {
    pub state: Mutex<PolicyState>,
}

impl FakePolicyStore {
    pub fn new(document: TrustPolicyDocument) -> Self {
        Self {
            state: Mutex::new(PolicyState {
                document,
                version: 1,
                writes: 0,
                lockout_acknowledged: Vec::new(),
                concurrent_admissions: VecDeque::new(),
            }),
        }
    }

    pub fn with_concurrent_admissions(self, accounts: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .concurrent_admissions
            .extend(accounts.iter().map(ToString::to_string));
        self
    }

    pub fn admitted(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .document
            .admitted_accounts(DEFAULT_CLAUSE_SID)
            .unwrap()
    }
}

#[async_trait]
impl PolicyStore for FakePolicyStore {
    async fn get_document(&self, location: &str) -> ServiceResult<VersionedPolicy> {
        if location != METADATA_BUCKET {
            return Err(ServiceError::not_found("s3", location));
        }
        let state = self.state.lock().unwrap();
        Ok(VersionedPolicy {
            document: state.document.clone(),
            version: format!("v{}", state.version),
        })
    }

    async fn put_document(
        &self,
        _location: &str,
        document: &TrustPolicyDocument,
        write: PolicyWrite<'_>,
    ) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(other) = state.concurrent_admissions.pop_front() {
            state.document.admit(DEFAULT_CLAUSE_SID, &other).unwrap();
            state.version += 1;
        }
        let current = format!("v{}", state.version);
        if write.expected_version.is_some_and(|v| v != current) {
            return Err(ServiceError::conflict("s3", format!("now at {current}")));
        }
        state.lockout_acknowledged.push(write.acknowledge_self_lockout_risk);
        state.document = document.clone();
        state.version += 1;
        state.writes += 1;
        Ok(())
    }
}

// ============================================================================
// Identity broker
// ============================================================================

/// Broker that denies the first `failures` calls, as a fresh account does.
pub struct FakeIdentity {
    pub failures: Mutex<u32>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeIdentity {
    pub fn failing(failures: u32) -> Self {
        Self {
            failures: Mutex::new(failures),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub fn credentials() -> TemporaryCredentials {
    TemporaryCredentials {
        access_key_id: "ASIAEXAMPLE".into(),
        secret_access_key: "secret".into(),
        session_token: "token".into(),
        expiration: None,
    }
}

#[async_trait]
impl IdentityBroker for FakeIdentity {
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> ServiceResult<TemporaryCredentials> {
        self.calls
            .lock()
            .unwrap()
            .push((role_arn.to_string(), session_name.to_string()));
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(ServiceError::rejected("sts", "AccessDenied", "role not assumable yet"));
        }
        Ok(credentials())
    }
}

// ============================================================================
// Blob store
// ============================================================================

pub struct FakeBlobs {
    pub objects: HashMap<(String, String), Vec<u8>>,
}

impl FakeBlobs {
    pub fn with_template(body: &[u8]) -> Self {
        Self {
            objects: HashMap::from([(
                (TEMPLATE_BUCKET.to_string(), TEMPLATE_KEY.to_string()),
                body.to_vec(),
            )]),
        }
    }

    pub fn empty() -> Self {
        Self {
            objects: HashMap::new(),
        }
    }
}

#[async_trait]
impl BlobStore for FakeBlobs {
    async fn get_object(&self, bucket: &str, key: &str) -> ServiceResult<Vec<u8>> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ServiceError::not_found("s3", format!("s3://{bucket}/{key}")))
    }
}

// ============================================================================
// Stack service
// ============================================================================

pub fn stack_event(resource_type: &str, status: &str) -> StackEvent {
    StackEvent {
        logical_resource_id: if resource_type == lz_vending_core::stack::STACK_RESOURCE_TYPE {
            STACK_NAME.into()
        } else {
            "BaselineRole".into()
        },
        resource_type: resource_type.into(),
        resource_status: status.into(),
        resource_status_reason: None,
    }
}

/// A nested stack's own lifecycle event, as it appears in the parent's event stream.
pub fn nested_stack(logical_id: &str, status: &str) -> StackEvent {
    StackEvent {
        logical_resource_id: logical_id.into(),
        ..whole_stack(status)
    }
}

pub fn child(status: &str) -> StackEvent {
    stack_event("AWS::IAM::Role", status)
}

pub fn whole_stack(status: &str) -> StackEvent {
    stack_event(lz_vending_core::stack::STACK_RESOURCE_TYPE, status)
}

#[derive(Debug, Default)]
pub struct StackState {
    pub create_error: Option<ServiceError>,
    /// Latest event returned by successive polls; the last one repeats.
    pub latest_events: VecDeque<StackEvent>,
    /// Errors returned by the next event polls, ahead of `latest_events`.
    pub describe_errors: VecDeque<ServiceError>,
    pub created: Vec<StackSpec>,
    pub polls: u32,
}

pub struct FakeStacks {
    pub state: Mutex<StackState>,
}

impl FakeStacks {
    pub fn with_events(events: Vec<StackEvent>) -> Self {
        Self {
            state: Mutex::new(StackState {
                latest_events: events.into(),
                ..StackState::default()
            }),
        }
    }

    /// Two child events, then whole-stack completion.
    pub fn completing() -> Self {
        Self::with_events(vec![
            whole_stack("CREATE_IN_PROGRESS"),
            child("CREATE_IN_PROGRESS"),
            child("CREATE_COMPLETE"),
            whole_stack("CREATE_COMPLETE"),
        ])
    }
}

#[async_trait]
impl StackService for FakeStacks {
    async fn create_stack(
        &self,
        _credentials: &TemporaryCredentials,
        spec: &StackSpec,
    ) -> ServiceResult<StackId> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.create_error.clone() {
            return Err(err);
        }
        state.created.push(spec.clone());
        Ok(StackId::new(STACK_ID).unwrap())
    }

    async fn describe_events(
        &self,
        _credentials: &TemporaryCredentials,
        _region: &str,
        _stack_name: &str,
    ) -> ServiceResult<Vec<StackEvent>> {
        let mut state = self.state.lock().unwrap();
        state.polls += 1;
        if let Some(err) = state.describe_errors.pop_front() {
            return Err(err);
        }
        let latest = if state.latest_events.len() > 1 {
            state.latest_events.pop_front()
        } else {
            state.latest_events.front().cloned()
        };
        Ok(latest.into_iter().collect())
    }

    async fn describe_stack(
        &self,
        _credentials: &TemporaryCredentials,
        _region: &str,
        stack_name: &str,
    ) -> ServiceResult<StackDescription> {
        Ok(StackDescription {
            stack_id: StackId::new(STACK_ID).unwrap(),
            stack_name: stack_name.to_string(),
            outputs: Vec::new(),
        })
    }
}

// ============================================================================
// Aliases
// ============================================================================

/// Alias service for one account. `aliases` is what the account currently holds.
#[derive(Default)]
pub struct FakeAliases {
    pub aliases: Mutex<Vec<String>>,
    pub error: Option<ServiceError>,
    pub list_calls: Mutex<u32>,
}

impl FakeAliases {
    /// An account holding `current` whose alias writes all fail with `error`.
    pub fn failing(current: &[&str], error: ServiceError) -> Self {
        Self {
            aliases: Mutex::new(current.iter().map(ToString::to_string).collect()),
            error: Some(error),
            list_calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl AliasService for FakeAliases {
    async fn set_account_alias(
        &self,
        _credentials: &TemporaryCredentials,
        alias: &str,
    ) -> ServiceResult<()> {
        if let Some(err) = self.error.clone() {
            return Err(err);
        }
        self.aliases.lock().unwrap().push(alias.to_string());
        Ok(())
    }

    async fn list_account_aliases(
        &self,
        _credentials: &TemporaryCredentials,
    ) -> ServiceResult<Vec<String>> {
        *self.list_calls.lock().unwrap() += 1;
        Ok(self.aliases.lock().unwrap().clone())
    }
}

// ============================================================================
// World
// ============================================================================

/// Every fake, shared with the provisioner under test.
pub struct World {
    pub organization: Arc<FakeOrganization>,
    pub inventory: Arc<MemoryInventory>,
    pub policies: Arc<FakePolicyStore>,
    pub identity: Arc<FakeIdentity>,
    pub blobs: Arc<FakeBlobs>,
    pub stacks: Arc<FakeStacks>,
    pub aliases: Arc<FakeAliases>,
}

impl World {
    pub fn new() -> Self {
        Self {
            organization: Arc::new(FakeOrganization::new()),
            inventory: Arc::new(MemoryInventory::new()),
            policies: Arc::new(FakePolicyStore::new(trust_policy(&json!(EXISTING_ADMITTED)))),
            identity: Arc::new(FakeIdentity::failing(2)),
            blobs: Arc::new(FakeBlobs::with_template(b"Resources: {}\n")),
            stacks: Arc::new(FakeStacks::completing()),
            aliases: Arc::new(FakeAliases::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            organization: self.organization.clone(),
            inventory: self.inventory.clone(),
            policies: self.policies.clone(),
            identity: self.identity.clone(),
            blobs: self.blobs.clone(),
            stacks: self.stacks.clone(),
            aliases: self.aliases.clone(),
        }
    }

    pub fn provisioner(&self) -> Provisioner {
        self.provisioner_with(config())
    }

    pub fn provisioner_with(&self, config: ProvisioningConfig) -> Provisioner {
        Provisioner::new(self.collaborators(), config)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
