use rds_broker_core::version::parse_lenient;

use crate::error::RdsError;

use super::AwsRdsClient;

impl AwsRdsClient {
    pub(crate) async fn do_get_latest_minor_version(
        &self,
        engine: &str,
        version: &str,
    ) -> Result<Option<String>, RdsError> {
        let targets = self.upgrade_targets(engine, version).await?;

        let mut latest: Option<(semver::Version, String)> = None;
        for target in &targets {
            if target.is_major_version_upgrade().unwrap_or(false) {
                continue;
            }
            let Some(candidate) = target.engine_version() else {
                continue;
            };
            let Ok(parsed) = parse_lenient(candidate) else {
                continue;
            };
            if latest.as_ref().is_none_or(|(best, _)| parsed > *best) {
                latest = Some((parsed, candidate.to_string()));
            }
        }

        Ok(latest.map(|(_, version)| version))
    }

    pub(crate) async fn do_get_full_valid_target_version(
        &self,
        engine: &str,
        current_version: &str,
        target_major: u64,
    ) -> Result<Option<String>, RdsError> {
        let targets = self.upgrade_targets(engine, current_version).await?;

        let mut best: Option<(semver::Version, String)> = None;
        for target in &targets {
            let Some(candidate) = target.engine_version() else {
                continue;
            };
            let Ok(parsed) = parse_lenient(candidate) else {
                continue;
            };
            if parsed.major != target_major {
                continue;
            }
            if best.as_ref().is_none_or(|(current_best, _)| parsed > *current_best) {
                best = Some((parsed, candidate.to_string()));
            }
        }

        Ok(best.map(|(_, version)| version))
    }

    async fn upgrade_targets(
        &self,
        engine: &str,
        version: &str,
    ) -> Result<Vec<aws_sdk_rds::types::UpgradeTarget>, RdsError> {
        let out = match self
            .client
            .describe_db_engine_versions()
            .engine(engine)
            .engine_version(version)
            .send()
            .await
        {
            Ok(out) => out,
            Err(err) => return Err(RdsError::from_metadata(err.into_service_error())),
        };

        Ok(out
            .db_engine_versions()
            .first()
            .map(|v| v.valid_upgrade_target().to_vec())
            .unwrap_or_default())
    }
}
