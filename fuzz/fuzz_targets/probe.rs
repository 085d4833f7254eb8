#![no_main]
use embedded_hal_fuzz::{i2c::I2cFuzz, shared_data::FuzzData};
use libfuzzer_sys::fuzz_target;

type Error = ();

fuzz_target!(|data: &[u8]| {
    let data = FuzzData::new(data);
    let i2c: I2cFuzz<'_, Error> = I2cFuzz::new(data);
    let mut sensor = hdc1050::new(i2c, hdc1050::mock_utils::SleepNop).with_retry_budget(8);
    // We ignore the results as we only care about potential crashes.
    if let Ok(true) = sensor.is_connected() {
        let _ = sensor.device_id();
        let _ = sensor.serial_id();
        let _ = sensor.is_battery_ok();
    }
});
