#[macro_export]
/// The `extract_params!` macro collects fields from a request builder into the
/// sorted key/value map that RPC-style DNS APIs expect as query parameters.
///
/// Every builder field is an `Option<T>` where `T: Display`. Three kinds of
/// entries are supported:
/// - `required field => "Key"`: missing values abort with `"<field> is required"`
/// - `optional field => "Key"`: missing values are left out of the map
/// - `default field = expr => "Key"`: missing values fall back to `expr`
///
/// The macro evaluates to `Result<BTreeMap<String, String>, String>`.
///
/// # Usage
///
/// ```rust
/// use dns_solver_macros::extract_params;
///
/// struct Builder {
///     domain: Option<String>,
///     keyword: Option<String>,
///     page_size: Option<u32>,
/// }
///
/// let builder = Builder { domain: Some("example.com".into()), keyword: None, page_size: None };
/// let params = extract_params!(builder, {
///     required domain => "DomainName",
///     optional keyword => "RRKeyWord",
///     default page_size = 500 => "PageSize",
/// })
/// .unwrap();
///
/// assert_eq!(params["DomainName"], "example.com");
/// assert_eq!(params["PageSize"], "500");
/// assert!(!params.contains_key("RRKeyWord"));
/// ```
macro_rules! extract_params {
    (@entry $params:ident, $builder:expr, required $field:ident => $key:literal) => {
        match $builder.$field.as_ref() {
            Some(value) => {
                $params.insert($key.to_string(), value.to_string());
            }
            None => return Err(format!("{} is required", stringify!($field))),
        }
    };
    (@entry $params:ident, $builder:expr, optional $field:ident => $key:literal) => {
        if let Some(value) = $builder.$field.as_ref() {
            $params.insert($key.to_string(), value.to_string());
        }
    };
    (@entry $params:ident, $builder:expr, default $field:ident = $default:expr => $key:literal) => {
        let value = match $builder.$field.as_ref() {
            Some(value) => value.to_string(),
            None => $default.to_string(),
        };
        $params.insert($key.to_string(), value);
    };

    (
        $builder:expr,
        {
            $( $kind:ident $field:ident $( = $default:expr )? => $key:literal ),* $(,)?
        }
    ) => {{
        (|| -> ::std::result::Result<::std::collections::BTreeMap<String, String>, String> {
            let mut params = ::std::collections::BTreeMap::new();
            $(
                $crate::extract_params!(@entry params, $builder, $kind $field $( = $default )? => $key);
            )*
            Ok(params)
        })()
    }};
}
