use shijim::exit::EXIT_OK;
use shijim::SubscriptionPlan;

fn main() {
    shijim_core::logging::init_logging();
    shijim::bootstrap(SubscriptionPlan::default());
    std::process::exit(EXIT_OK);
}
