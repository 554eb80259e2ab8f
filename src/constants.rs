pub const RECIPE_COUNT_PER_PAGE: i64 = 10;
pub const TAG_COUNT_PER_PAGE: i64 = 50;
pub const INGREDIENT_COUNT_PER_PAGE: i64 = 50;

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_PRICE_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

pub const MEDIA_URL: &str = "/media/";
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_MEDIA_ROOT: &str = "./media";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const MAX_JSON_BYTES: u64 = 64 * 1024;
