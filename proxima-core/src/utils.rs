/// Reference proximity range, in map distance units.
pub const DEFAULT_RANGE: u32 = 20;

/// Channel a client lands in when it does not pick one.
pub const DEFAULT_CHANNEL: i32 = 0;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_3: &str = "stun:stun2.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_4: &str = "stun:stun3.l.google.com:19302";

pub fn default_stun_servers() -> Vec<String> {
    [
        DEFAULT_STUN_ADDR,
        DEFAULT_STUN_ADDR_2,
        DEFAULT_STUN_ADDR_3,
        DEFAULT_STUN_ADDR_4,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
