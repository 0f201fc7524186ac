//! Account alias update.

use tracing::{error, info, instrument};

use lz_vending_core::{canonical_alias, AliasService, ProvisionError, Result, TemporaryCredentials};

/// Set the account alias to the canonical (lowercase) form of `account_name`.
///
/// Alias names are unique across every account. When the write reports the
/// alias as taken, the account's own aliases decide: already holding it is
/// success, otherwise another account owns it.
///
/// # Errors
///
/// [`ProvisionError::AliasTaken`] when another account holds the alias, and
/// any other alias service failure.
#[instrument(skip_all, fields(account_name = %account_name))]
pub async fn rename(
    aliases: &dyn AliasService,
    credentials: &TemporaryCredentials,
    account_name: &str,
) -> Result<String> {
    let alias = canonical_alias(account_name);
    match aliases.set_account_alias(credentials, &alias).await {
        Ok(()) => info!(%alias, "Account alias set"),
        Err(err) if err.is_already_exists() => {
            let current = aliases
                .list_account_aliases(credentials)
                .await
                .map_err(|err| ProvisionError::service("list_account_aliases", err))?;
            if !current.contains(&alias) {
                error!(%alias, ?current, "Account alias belongs to another account");
                return Err(ProvisionError::AliasTaken { alias, current });
            }
            info!(%alias, "Account alias already set");
        }
        Err(err) => return Err(ProvisionError::service("set_account_alias", err)),
    }
    Ok(alias)
}
