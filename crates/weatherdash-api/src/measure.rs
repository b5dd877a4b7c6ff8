// Measurement endpoint
//
// `getmeasure` returns a time series for one module and a set of
// measurement types at a given scale. Rows are decoded into
// `MeasurePoint`s sorted by timestamp.

use secrecy::SecretString;
use tracing::trace;

use crate::client::NetatmoClient;
use crate::error::Error;
use crate::models::{MeasurePoint, MeasureQuery, RawMeasureBody};

impl NetatmoClient {
    /// Fetch a measurement series. An empty result means the vendor has
    /// no samples for the requested range.
    pub async fn get_measure(
        &self,
        access_token: &SecretString,
        query: &MeasureQuery,
    ) -> Result<Vec<MeasurePoint>, Error> {
        let url = self.endpoint("/api/getmeasure")?;

        let mut params = vec![
            ("device_id", query.device_id.clone()),
            ("module_id", query.module_id.clone()),
            ("scale", query.scale.clone()),
            ("type", query.types.join(",")),
            ("date_begin", query.date_begin.to_string()),
            ("optimize", "false".to_owned()),
            ("real_time", "false".to_owned()),
        ];
        if let Some(end) = query.date_end {
            params.push(("date_end", end.to_string()));
        }

        let body: RawMeasureBody = self.get(url, access_token, &params).await?;
        decode_series(body)
    }
}

fn decode_series(body: RawMeasureBody) -> Result<Vec<MeasurePoint>, Error> {
    let RawMeasureBody::Series(rows) = body else {
        return Ok(Vec::new());
    };

    let mut points = rows
        .into_iter()
        .map(|(ts, values)| {
            let timestamp = ts.parse::<i64>().map_err(|e| Error::Deserialization {
                message: format!("invalid measure timestamp {ts:?}: {e}"),
                body: String::new(),
            })?;
            Ok(MeasurePoint { timestamp, values })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    // Map keys are strings, so lexical order is not numeric order.
    points.sort_by_key(|p| p.timestamp);
    trace!(points = points.len(), "decoded measure series");
    Ok(points)
}
