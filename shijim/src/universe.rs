//! Universe resolution, grounded on spec §7's "Degraded (fall back)"
//! entry for "Universe empty on startup".

use shijim_subscription::SubscriptionPlan;

/// Built-in safe list used when the caller-supplied universe is empty:
/// a handful of liquid large-cap stocks plus the front-month index
/// future.
pub fn safe_list_fallback() -> SubscriptionPlan {
    SubscriptionPlan {
        futures: vec!["TXFR1".to_string()],
        stocks: vec!["2330".to_string(), "0050".to_string(), "2317".to_string(), "2412".to_string()],
    }
}

/// Returns `plan` unchanged unless it has no targets at all, in which
/// case the built-in safe list is substituted and the fallback is
/// logged.
pub fn resolve_universe(plan: SubscriptionPlan) -> SubscriptionPlan {
    if plan.futures.is_empty() && plan.stocks.is_empty() {
        tracing::warn!("universe empty on startup, falling back to built-in safe list");
        safe_list_fallback()
    } else {
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan_falls_back_to_safe_list() {
        let resolved = resolve_universe(SubscriptionPlan::default());
        assert_eq!(resolved.stocks, vec!["2330", "0050", "2317", "2412"]);
        assert_eq!(resolved.futures, vec!["TXFR1"]);
    }

    #[test]
    fn non_empty_plan_passes_through_unchanged() {
        let plan = SubscriptionPlan { futures: vec![], stocks: vec!["2888".to_string()] };
        let resolved = resolve_universe(plan.clone());
        assert_eq!(resolved, plan);
    }
}
