//! SOAP 1.2 fault rendering.

use hie_types::ns;
use quick_xml::escape::escape;

/// Build a minimal SOAP 1.2 fault for an encode-time failure.
///
/// The fault code is prefixed into the envelope namespace (`s:Receiver`,
/// `s:Sender`); the reason and optional detail are escaped free text. The
/// transport layer maps this body to a 500-class response.
pub fn build_soap_fault(code: &str, reason: &str, detail: Option<&str>) -> String {
    let mut fault = String::new();
    fault.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>");
    fault.push_str(&format!("<s:Envelope xmlns:s=\"{}\">", ns::SOAP_ENV));
    fault.push_str("<s:Body><s:Fault>");
    fault.push_str(&format!("<Code><Value>s:{}</Value></Code>", escape(code)));
    fault.push_str(&format!("<Reason><Text>{}</Text></Reason>", escape(reason)));
    if let Some(detail) = detail {
        fault.push_str(&format!("<Detail><Error>{}</Error></Detail>", escape(detail)));
    }
    fault.push_str("</s:Fault></s:Body></s:Envelope>");
    fault
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_code_reason_and_detail() {
        let fault = build_soap_fault("Receiver", "Processing Failure", Some("boom"));
        assert!(fault.contains("<Code><Value>s:Receiver</Value></Code>"));
        assert!(fault.contains("<Reason><Text>Processing Failure</Text></Reason>"));
        assert!(fault.contains("<Detail><Error>boom</Error></Detail>"));
        assert!(fault.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?><s:Envelope"));
    }

    #[test]
    fn detail_is_optional() {
        let fault = build_soap_fault("Sender", "bad input", None);
        assert!(!fault.contains("<Detail>"));
    }

    #[test]
    fn reason_text_is_escaped() {
        let fault = build_soap_fault("Receiver", "size < expected & odd", None);
        assert!(fault.contains("size &lt; expected &amp; odd"));
    }
}
