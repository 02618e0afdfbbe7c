pub mod base64;
pub mod file;
pub mod http_std;
pub mod string;
pub mod system;
pub mod url;

pub use self::base64::{base64_decode, base64_encode};
pub use self::http_std::{HttpClient, HttpResponse, ReqwestClient};
pub use self::url::{url_decode, url_encode};

