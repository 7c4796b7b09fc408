const MIN_PHONE_DIGITS: usize = 8;
const MAX_PHONE_DIGITS: usize = 15;
const MAX_COUNTRY_CODE_DIGITS: usize = 4;
const OTP_LEN: usize = 6;
const MAX_NAME_LEN: usize = 256;
const MAX_TOKEN_LEN: usize = 4096;
const MAX_PATH_SEGMENT_LEN: usize = 256;
const MAX_ANSWER_CODE: u8 = 4;

fn has_control_chars(input: &str) -> bool {
    input.chars().any(char::is_control)
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.trim().is_empty() {
        return Err("Please enter your phone number".to_string());
    }
    if !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err("Phone number must contain digits only".to_string());
    }
    if phone.len() < MIN_PHONE_DIGITS || phone.len() > MAX_PHONE_DIGITS {
        return Err("Please enter a valid phone number".to_string());
    }
    Ok(())
}

pub fn validate_country_code(code: &str) -> Result<(), String> {
    let Some(digits) = code.strip_prefix('+') else {
        return Err("Country code must start with '+'".to_string());
    };
    if digits.is_empty()
        || digits.len() > MAX_COUNTRY_CODE_DIGITS
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return Err(format!("Invalid country code: {code}"));
    }
    Ok(())
}

pub fn validate_otp(otp: &str) -> Result<(), String> {
    if otp.len() != OTP_LEN || !otp.chars().all(|c| c.is_ascii_digit()) {
        return Err("Please enter the complete 6-digit OTP".to_string());
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("Name is too long (max {MAX_NAME_LEN} chars)"));
    }
    if has_control_chars(name) {
        return Err("Name contains control characters".to_string());
    }
    Ok(())
}

pub fn validate_age(age: &str) -> Result<u32, String> {
    let parsed: u32 = age
        .trim()
        .parse()
        .map_err(|_| format!("Age must be a whole number, got '{age}'"))?;
    if !(1..150).contains(&parsed) {
        return Err("Age must be between 1 and 149".to_string());
    }
    Ok(parsed)
}

pub fn validate_positive(label: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{label} must be greater than zero"));
    }
    Ok(())
}

pub fn validate_answer_code(label: &str, code: u8) -> Result<(), String> {
    if !(1..=MAX_ANSWER_CODE).contains(&code) {
        return Err(format!("{label} must be between 1 and {MAX_ANSWER_CODE}"));
    }
    Ok(())
}

pub fn validate_token(token: &str) -> Result<(), String> {
    if token.is_empty() {
        return Err("Token is required".to_string());
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(format!("Token is too long (max {MAX_TOKEN_LEN} chars)"));
    }
    if has_control_chars(token) {
        return Err("Token contains control characters".to_string());
    }
    Ok(())
}

pub fn validate_base_url(url: &str) -> Result<(), String> {
    let parsed = reqwest::Url::parse(url).map_err(|e| format!("Invalid API base URL: {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err("API base URL must use http or https".to_string());
    }
    if parsed.host_str().is_none() {
        return Err("API base URL must include host".to_string());
    }
    Ok(())
}

pub fn validate_endpoint(endpoint: &str) -> Result<(), String> {
    if endpoint.is_empty() {
        return Err("Endpoint is required".to_string());
    }
    if !endpoint.starts_with('/') {
        return Err(format!("Endpoint must start with '/': {endpoint}"));
    }
    if has_control_chars(endpoint) {
        return Err("Endpoint contains control characters".to_string());
    }
    Ok(())
}

pub fn validate_path_segment(label: &str, segment: &str) -> Result<(), String> {
    if segment.trim().is_empty() {
        return Err(format!("{label} is required"));
    }
    if segment.len() > MAX_PATH_SEGMENT_LEN {
        return Err(format!("{label} is too long (max {MAX_PATH_SEGMENT_LEN} chars)"));
    }
    if has_control_chars(segment) {
        return Err(format!("{label} contains control characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_requires_enough_digits() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("").is_err());
        assert!(validate_phone("1234567").is_err());
        assert!(validate_phone("98765-43210").is_err());
    }

    #[test]
    fn country_code_needs_plus_and_digits() {
        assert!(validate_country_code("+91").is_ok());
        assert!(validate_country_code("+1").is_ok());
        assert!(validate_country_code("91").is_err());
        assert!(validate_country_code("+").is_err());
        assert!(validate_country_code("+12345").is_err());
    }

    #[test]
    fn otp_must_be_six_digits() {
        assert!(validate_otp("123456").is_ok());
        assert!(validate_otp("12345").is_err());
        assert!(validate_otp("12345a").is_err());
        assert!(validate_otp("1234567").is_err());
    }

    #[test]
    fn age_is_bounded() {
        assert_eq!(validate_age(" 25 ").unwrap(), 25);
        assert!(validate_age("0").is_err());
        assert!(validate_age("150").is_err());
        assert!(validate_age("abc").is_err());
    }

    #[test]
    fn token_rejects_control_chars() {
        assert!(validate_token("abc\ndef").is_err());
        assert!(validate_token("eyJhbGciOiJIUzI1NiJ9.abc_xyz-123").is_ok());
    }

    #[test]
    fn base_url_requires_http_scheme() {
        assert!(validate_base_url("http://localhost:3010/api").is_ok());
        assert!(validate_base_url("https://api.zeefit.in/api").is_ok());
        assert!(validate_base_url("ftp://example.com").is_err());
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn endpoint_must_be_rooted() {
        assert!(validate_endpoint("/users/me").is_ok());
        assert!(validate_endpoint("").is_err());
        assert!(validate_endpoint("users/me").is_err());
    }

    #[test]
    fn answer_codes_are_one_to_four() {
        assert!(validate_answer_code("q1", 1).is_ok());
        assert!(validate_answer_code("q1", 4).is_ok());
        assert!(validate_answer_code("q1", 0).is_err());
        assert!(validate_answer_code("q1", 5).is_err());
    }
}
