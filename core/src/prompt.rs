// Advisory prompt construction

use crate::record::SensorRecord;

/// Word ceiling we ask the agent to respect for the advice text.
const ADVICE_WORD_LIMIT: usize = 40;

/// Build the advisory request for one sensor reading.
///
/// Pure and total: any subset of fields may be absent, in which case the
/// measurement is rendered as `unknown` so the agent always sees the same
/// shape. Never returns an empty string.
pub fn build_agent_prompt(record: &SensorRecord) -> String {
    format!(
        "Sensor reading: farm {farm}, time {time}. \
         Soil moisture {moisture}%, soil temp {soil_temp}°C, \
         air temp {air_temp}°C, humidity {humidity}%, rain {rain}mm, pH {ph}. \
         As an agronomist, provide a short (<{limit} words) actionable recommendation \
         for irrigation or fertilizer, and a confidence score 0-100. \
         Respond in JSON with keys: advice, confidence, reason.",
        farm = record.entity_id(),
        time = record.timestamp.as_deref().unwrap_or("unknown"),
        moisture = measurement(record.soil_moisture),
        soil_temp = measurement(record.soil_temperature),
        air_temp = measurement(record.air_temperature),
        humidity = measurement(record.humidity),
        rain = measurement(record.rain_mm),
        ph = measurement(record.ph),
        limit = ADVICE_WORD_LIMIT,
    )
}

fn measurement(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "unknown".to_string(),
    }
}
