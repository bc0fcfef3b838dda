// SOAP envelope construction and response-field extraction.
//
// The wire format is fixed text, but body content is assembled through a
// small builder that escapes every value it is given — the device accepts
// the same envelopes the stock firmware tools produce, while user-supplied
// text (usernames, derived passwords) can never break the markup.

use crate::signing::HNAP_NAMESPACE;

/// Escape the five XML special characters in text content.
pub fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inner content of one HNAP action element, built element by element.
///
/// Element names are crate-controlled constants and are not escaped;
/// element values always are.
#[derive(Debug, Clone, Default)]
pub struct SoapBody {
    xml: String,
}

impl SoapBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `<name>value</name>` with the value escaped.
    pub fn element(mut self, name: &str, value: &str) -> Self {
        self.xml.push('<');
        self.xml.push_str(name);
        self.xml.push('>');
        self.xml.push_str(&escape_text(value));
        self.xml.push_str("</");
        self.xml.push_str(name);
        self.xml.push('>');
        self
    }

    /// Append a self-closing `<name/>`.
    pub fn empty_element(mut self, name: &str) -> Self {
        self.xml.push('<');
        self.xml.push_str(name);
        self.xml.push_str("/>");
        self
    }

    pub fn as_xml(&self) -> &str {
        &self.xml
    }
}

/// Wrap an action body in the SOAP 1.1 envelope the firmware expects.
pub fn envelope(action: &str, body: &SoapBody) -> String {
    let body = body.as_xml();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <soap:Envelope \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
         xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" \
         xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soap:Body>\
         <{action} xmlns=\"{HNAP_NAMESPACE}\">{body}</{action}>\
         </soap:Body>\
         </soap:Envelope>"
    )
}

/// `<ModuleID>{module}</ModuleID>` — the module addressing used by every
/// read action (1 = socket, 2 = power meter, 3 = temperature sensor).
pub fn module_parameters(module: u32) -> SoapBody {
    SoapBody::new().element("ModuleID", &module.to_string())
}

/// Control parameters for `SetSocketSettings`.
///
/// Legacy firmware additionally requires a fixed controller id.
pub fn control_parameters(module: u32, on: bool, legacy: bool) -> SoapBody {
    let body = module_parameters(module)
        .element("NickName", "Socket 1")
        .element("Description", "Socket 1")
        .element("OPStatus", if on { "true" } else { "false" });
    if legacy {
        body.element("Controller", "1")
    } else {
        body
    }
}

/// Text of the first element whose local tag name is `field`.
///
/// Missing element, empty element, and a body that is not XML at all are
/// indistinguishable to callers: all yield `None`. The firmware genuinely
/// conflates "empty" and "absent" for some fields, so no stricter reading
/// is possible here.
pub fn extract_field(xml: &str, field: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(xml).ok()?;
    doc.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == field)
        .and_then(|n| n.text())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_special_characters() {
        assert_eq!(
            escape_text(r#"a<b>&"quoted"&'x'"#),
            "a&lt;b&gt;&amp;&quot;quoted&quot;&amp;&apos;x&apos;"
        );
    }

    #[test]
    fn envelope_wraps_action_in_hnap_namespace() {
        let body = SoapBody::new().element("Action", "request");
        let xml = envelope("Login", &body);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<Login xmlns=\"http://purenetworks.com/HNAP1/\">"));
        assert!(xml.contains("<Action>request</Action>"));
        assert!(xml.ends_with("</soap:Body></soap:Envelope>"));
    }

    #[test]
    fn body_values_are_escaped() {
        let body = SoapBody::new().element("LoginPassword", "a&b<c>");
        assert_eq!(
            body.as_xml(),
            "<LoginPassword>a&amp;b&lt;c&gt;</LoginPassword>"
        );
    }

    #[test]
    fn empty_elements_self_close() {
        let body = SoapBody::new().empty_element("Captcha");
        assert_eq!(body.as_xml(), "<Captcha/>");
    }

    #[test]
    fn control_parameters_legacy_adds_controller() {
        let legacy = control_parameters(1, true, true);
        assert!(legacy.as_xml().contains("<Controller>1</Controller>"));
        assert!(legacy.as_xml().contains("<OPStatus>true</OPStatus>"));

        let current = control_parameters(1, false, false);
        assert!(!current.as_xml().contains("Controller"));
        assert!(current.as_xml().contains("<OPStatus>false</OPStatus>"));
    }

    #[test]
    fn extract_finds_first_match_across_namespaces() {
        let xml = r#"<?xml version="1.0"?>
            <soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
              <soap:Body>
                <GetSocketSettingsResponse xmlns="http://purenetworks.com/HNAP1/">
                  <OPStatus>true</OPStatus>
                </GetSocketSettingsResponse>
              </soap:Body>
            </soap:Envelope>"#;
        assert_eq!(extract_field(xml, "OPStatus").as_deref(), Some("true"));
    }

    #[test]
    fn extract_missing_and_empty_are_both_absent() {
        let xml = "<r><Empty></Empty><AlsoEmpty/></r>";
        assert_eq!(extract_field(xml, "Missing"), None);
        assert_eq!(extract_field(xml, "Empty"), None);
        assert_eq!(extract_field(xml, "AlsoEmpty"), None);
    }

    #[test]
    fn extract_tolerates_garbage() {
        assert_eq!(extract_field("not xml at all", "X"), None);
    }
}
