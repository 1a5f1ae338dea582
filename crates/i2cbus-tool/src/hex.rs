use derive_more::Display;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[display("empty value")]
    Empty,
    #[display("invalid number: {_0}")]
    Number(String),
    #[display("invalid byte: {_0}")]
    Byte(String),
}

impl std::error::Error for ParseError {}

/// Parse `0x48`, `48h` or `72` into a slave address.
pub fn parse_address(s: &str) -> Result<u16, ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseError::Empty);
    }
    let parsed = if let Some(hex) =
        s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
    {
        u16::from_str_radix(hex, 16)
    } else if let Some(hex) = s.strip_suffix('h') {
        u16::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|_| ParseError::Number(s.to_owned()))
}

/// Bytes given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(pub Vec<u8>);

pub fn parse_payload(s: &str) -> Result<Payload, ParseError> {
    parse_bytes(s).map(Payload)
}

/// Parse a payload such as `01 02 ff`, `0x01,0x02` or `0102ff`.
pub fn parse_bytes(s: &str) -> Result<Vec<u8>, ParseError> {
    let tokens: Vec<&str> = s
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut out = Vec::new();
    for token in tokens {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if digits.is_empty() || digits.len() % 2 != 0 {
            return Err(ParseError::Byte(token.to_owned()));
        }
        for pair in digits.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair)
                .map_err(|_| ParseError::Byte(token.to_owned()))?;
            let byte = u8::from_str_radix(pair, 16)
                .map_err(|_| ParseError::Byte(token.to_owned()))?;
            out.push(byte);
        }
    }
    Ok(out)
}

pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
