//! Sample weather scenario, enabled with `vox run --demo`.

use anyhow::Result;
use vox_core::VoxError;
use vox_scenarios::{Scenario, Timeline, Trigger};

pub fn weather_scenario() -> Result<Scenario, VoxError> {
    let ask = Trigger::builder(["weather"])
        .synonyms("weather", ["clouds", "nature"])
        .callback(|_| say("Would you like me to fetch the weather?"))
        .build()?;
    let fetch = Trigger::builder(["yes"])
        .callback(|_| say("It's cloudy today, with eight degrees outside."))
        .build()?;

    Ok(Scenario::new("weather", Timeline::new([ask, fetch])).with_max_gap(3))
}

fn say(text: &str) -> Result<()> {
    println!("{}", text);
    Ok(())
}
