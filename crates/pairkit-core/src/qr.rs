use serde::Serialize;

/// Wire shape of the QR payload. Field order is significant.
#[derive(Serialize)]
struct QrPayload<'a> {
    s: &'a str,
    p: &'a str,
    t: &'a str,
}

/// Build the JSON string a device scans in QR mode.
///
/// `token` must already be in radio form.
pub fn qr_payload(ssid: &str, password: &str, token: &str) -> String {
    serde_json::to_string(&QrPayload {
        s: ssid,
        p: password,
        t: token,
    })
    .unwrap_or_default()
}
