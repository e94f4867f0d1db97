#![forbid(unsafe_code)]
//! Bootstrap wiring for the shijim pipeline (spec §1): loads
//! configuration, resolves the trading universe (falling back to a
//! built-in safe list when empty), and logs a startup summary. Broker
//! session wiring, universe ranking, and process lifecycle are external
//! collaborators (spec §1 "Explicitly OUT OF SCOPE") represented only
//! by the trait seams in `shijim-subscription`/`shijim-execution`.

pub mod config;
pub mod exit;
pub mod universe;

pub use config::AppConfig;
pub use shijim_subscription::SubscriptionPlan;

/// Load configuration, resolve the universe, and log a startup
/// summary. Returns the resolved plan so a caller that does wire up
/// broker sessions can hand it to a `SubscriptionManager`.
pub fn bootstrap(external_plan: SubscriptionPlan) -> (AppConfig, SubscriptionPlan) {
    let config = AppConfig::from_env();
    let plan = universe::resolve_universe(external_plan);

    tracing::info!(
        shard_id = config.shard.shard_id,
        total_shards = config.shard.total_shards,
        futures = plan.futures.len(),
        stocks = plan.stocks.len(),
        raw_dir = %config.storage.raw_dir.display(),
        "shijim bootstrap complete"
    );

    (config, plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_falls_back_to_safe_list_when_plan_empty() {
        let (_, plan) = bootstrap(SubscriptionPlan::default());
        assert!(!plan.stocks.is_empty());
    }
}
