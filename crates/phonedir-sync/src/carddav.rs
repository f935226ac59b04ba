use crate::source::CardSource;
use crate::{Result, SyncError};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("phonedir/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct CardDavOptions {
    pub addressbook_url: String,
    pub username: String,
    pub password: String,
    pub user_agent: Option<String>,
    pub timeout: Duration,
    pub verify_tls: bool,
}

/// Collection URL of a Nextcloud address book.
pub fn nextcloud_addressbook_url(base: &str, username: &str, addressbook: &str) -> String {
    format!(
        "{}/remote.php/dav/addressbooks/users/{}/{}/",
        base.trim().trim_end_matches('/'),
        username,
        addressbook
    )
}

#[cfg(feature = "dav-sync")]
mod imp {
    use super::{CardDavOptions, CardSource, Result, SyncError, DEFAULT_USER_AGENT};
    use phonedir_core::RawCard;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use reqwest::blocking::Client;
    use reqwest::Method;
    use std::borrow::Cow;
    use std::time::Duration;
    use url::{Host, Url};

    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    const REPORT_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<card:addressbook-query xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:prop>
    <d:getetag/>
    <card:address-data/>
  </d:prop>
</card:addressbook-query>
"#;

    #[derive(Debug, Clone)]
    pub struct CardDavSource {
        options: CardDavOptions,
    }

    impl CardDavSource {
        pub fn new(options: CardDavOptions) -> Self {
            Self { options }
        }
    }

    impl CardSource for CardDavSource {
        fn source_name(&self) -> &'static str {
            "carddav"
        }

        fn fetch_cards(&self) -> Result<Vec<RawCard>> {
            fetch_cards(&self.options)
        }
    }

    fn fetch_cards(options: &CardDavOptions) -> Result<Vec<RawCard>> {
        let url = checked_url(&options.addressbook_url)?;
        let client = Client::builder()
            .user_agent(options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
            .timeout(options.timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(options.timeout))
            .danger_accept_invalid_certs(!options.verify_tls)
            .build()?;
        let report_method = Method::from_bytes(b"REPORT")
            .map_err(|_| SyncError::Parse("invalid REPORT method".to_string()))?;

        let response = client
            .request(report_method, url)
            .basic_auth(&options.username, Some(&options.password))
            .header("Depth", "1")
            .header("Content-Type", "application/xml; charset=utf-8")
            .header("Accept", "application/xml")
            .body(REPORT_BODY)
            .send()?
            .error_for_status()?;

        let body = response.text()?;
        let cards = parse_address_data(&body)?;
        Ok(cards.into_iter().map(RawCard::new).collect())
    }

    fn checked_url(raw: &str) -> Result<Url> {
        let url = Url::parse(raw.trim())?;
        match url.scheme() {
            "https" => Ok(url),
            "http" if is_loopback(&url) => Ok(url),
            _ => Err(SyncError::InsecureUrl(url.to_string())),
        }
    }

    fn is_loopback(url: &Url) -> bool {
        match url.host() {
            Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            Some(Host::Ipv4(addr)) => addr.is_loopback(),
            Some(Host::Ipv6(addr)) => addr.is_loopback(),
            None => false,
        }
    }

    fn parse_address_data(body: &str) -> Result<Vec<String>> {
        let mut reader = Reader::from_str(body);
        reader.config_mut().trim_text(false);

        let mut cards = Vec::new();
        let mut current = String::new();
        let mut in_address_data = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref event)) if is_address_data(event.local_name().as_ref()) => {
                    in_address_data = true;
                    current.clear();
                }
                Ok(Event::End(ref event)) if is_address_data(event.local_name().as_ref()) => {
                    in_address_data = false;
                    let normalized = strip_common_indent(&current);
                    if !normalized.trim().is_empty() {
                        cards.push(normalized);
                    }
                    current.clear();
                }
                Ok(Event::Text(event)) if in_address_data => {
                    let text = event
                        .unescape()
                        .map_err(|err| SyncError::Parse(err.to_string()))?;
                    current.push_str(&text);
                }
                Ok(Event::CData(event)) if in_address_data => {
                    current.push_str(&String::from_utf8_lossy(event.as_ref()));
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(SyncError::Parse(err.to_string())),
            }
        }

        Ok(cards)
    }

    fn is_address_data(name: &[u8]) -> bool {
        name.eq_ignore_ascii_case(b"address-data")
    }

    /// Pretty-printed multistatus bodies indent the card text. Folded lines
    /// keep their one extra space after the shared indent is removed.
    fn strip_common_indent(raw: &str) -> String {
        let normalized = normalize_line_endings(raw);
        let mut lines: Vec<&str> = normalized.lines().collect();
        while matches!(lines.first(), Some(line) if line.trim().is_empty()) {
            lines.remove(0);
        }
        while matches!(lines.last(), Some(line) if line.trim().is_empty()) {
            lines.pop();
        }

        let indent = common_indent(&lines);
        let mut out = String::new();
        for line in lines {
            let mut rest = line;
            for _ in 0..indent {
                match rest.strip_prefix([' ', '\t']) {
                    Some(stripped) => rest = stripped,
                    None => break,
                }
            }
            out.push_str(rest);
            out.push('\n');
        }
        out
    }

    // BEGIN/END are skipped: servers often put BEGIN right after the tag.
    fn common_indent(lines: &[&str]) -> usize {
        lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| {
                let upper = line.trim().to_ascii_uppercase();
                !upper.starts_with("BEGIN:VCARD") && !upper.starts_with("END:VCARD")
            })
            .map(|line| {
                line.chars()
                    .take_while(|ch| *ch == ' ' || *ch == '\t')
                    .count()
            })
            .min()
            .unwrap_or(0)
    }

    fn normalize_line_endings(input: &str) -> Cow<'_, str> {
        if !input.contains('\r') {
            return Cow::Borrowed(input);
        }
        Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
    }

    #[cfg(test)]
    mod tests {
        use super::{checked_url, parse_address_data};
        use crate::SyncError;
        use phonedir_core::{parse_card, RawCard};

        #[test]
        fn parses_address_data_entries() {
            let xml = r#"
<d:multistatus xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:response>
    <d:propstat>
      <d:prop>
        <d:getetag>"1"</d:getetag>
        <card:address-data>BEGIN:VCARD
VERSION:3.0
FN:Ada Lovelace
TEL;TYPE=cell:+44 20 7946 0000
END:VCARD
        </card:address-data>
      </d:prop>
    </d:propstat>
  </d:response>
  <d:response>
    <d:propstat>
      <d:prop>
        <card:address-data><![CDATA[BEGIN:VCARD
VERSION:3.0
FN:Grace & Co
END:VCARD]]></card:address-data>
      </d:prop>
    </d:propstat>
  </d:response>
</d:multistatus>
"#;
            let cards = parse_address_data(xml).expect("parse");
            assert_eq!(cards.len(), 2);
            assert!(cards[0].contains("Ada Lovelace"));
            assert!(cards[1].contains("Grace & Co"));
        }

        #[test]
        fn unescapes_entities_in_card_text() {
            let xml = r#"<d:multistatus xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav"><d:response><card:address-data>BEGIN:VCARD
VERSION:3.0
FN:Smith &amp; Sons
END:VCARD</card:address-data></d:response></d:multistatus>"#;
            let cards = parse_address_data(xml).expect("parse");
            let record = parse_card(&RawCard::new(cards[0].clone())).expect("card");
            assert_eq!(record.formatted_name.as_deref(), Some("Smith & Sons"));
        }

        #[test]
        fn strips_indentation_but_keeps_folding() {
            let xml = r#"
<d:multistatus xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:response>
    <card:address-data>BEGIN:VCARD
          VERSION:3.0
          FN:Ada
           Lovelace
          TEL;TYPE=work:030 1234
          END:VCARD
    </card:address-data>
  </d:response>
</d:multistatus>
"#;
            let cards = parse_address_data(xml).expect("parse");
            assert_eq!(cards.len(), 1);
            let record = parse_card(&RawCard::new(cards[0].clone())).expect("card");
            assert_eq!(record.formatted_name.as_deref(), Some("AdaLovelace"));
            assert_eq!(record.phone_entries.len(), 1);
        }

        #[test]
        fn skips_empty_address_data() {
            let xml = r#"<d:multistatus xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav"><d:response><card:address-data>
   </card:address-data></d:response></d:multistatus>"#;
            assert!(parse_address_data(xml).expect("parse").is_empty());
        }

        #[test]
        fn rejects_malformed_xml() {
            let err = parse_address_data("<d:multistatus><d:response></d:multistatus>").unwrap_err();
            assert!(matches!(err, SyncError::Parse(_)));
        }

        #[test]
        fn https_is_required_unless_loopback() {
            assert!(checked_url("https://cloud.example.com/dav/").is_ok());
            assert!(checked_url("http://localhost:8080/dav/").is_ok());
            assert!(checked_url("http://127.0.0.1/dav/").is_ok());
            assert!(checked_url("http://[::1]/dav/").is_ok());
            assert!(matches!(
                checked_url("http://cloud.example.com/dav/"),
                Err(SyncError::InsecureUrl(_))
            ));
            assert!(matches!(
                checked_url("ftp://localhost/dav/"),
                Err(SyncError::InsecureUrl(_))
            ));
            assert!(matches!(checked_url("not a url"), Err(SyncError::Url(_))));
        }
    }
}

#[cfg(not(feature = "dav-sync"))]
mod imp {
    use super::{CardDavOptions, CardSource, Result, SyncError};
    use phonedir_core::RawCard;

    #[derive(Debug, Clone)]
    pub struct CardDavSource {
        options: CardDavOptions,
    }

    impl CardDavSource {
        pub fn new(options: CardDavOptions) -> Self {
            Self { options }
        }
    }

    impl CardSource for CardDavSource {
        fn source_name(&self) -> &'static str {
            "carddav"
        }

        fn fetch_cards(&self) -> Result<Vec<RawCard>> {
            let _ = &self.options;
            Err(SyncError::Unavailable(
                "CardDAV sync requires the dav-sync feature".to_string(),
            ))
        }
    }
}

pub use imp::CardDavSource;
