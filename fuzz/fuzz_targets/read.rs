#![no_main]
use embedded_hal_fuzz::{i2c::I2cFuzz, shared_data::FuzzData};
use hdc1050::{HumidityResolution, TemperatureResolution};
use libfuzzer_sys::fuzz_target;

type Error = ();

fuzz_target!(|data: &[u8]| {
    let data = FuzzData::new(data);
    let i2c: I2cFuzz<'_, Error> = I2cFuzz::new(data);
    let mut sensor = hdc1050::new(i2c, hdc1050::mock_utils::SleepNop).with_retry_budget(8);
    sensor.set_temperature_resolution(TemperatureResolution::Bits11);
    sensor.set_humidity_resolution(HumidityResolution::Bits8);
    if sensor.commit_configuration().is_ok() {
        // We ignore the result as it is likely garbage. We don't care about
        // the result/error just if it crashes or not.
        let _ = sensor.read_temperature_and_humidity();
    }
});
