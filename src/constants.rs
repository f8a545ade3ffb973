// --- ENDPOINT DEFAULTS ---
pub const DEFAULT_CHAINS_URL: &str = "https://api.schwabapi.com/marketdata/v1/chains";
pub const DEFAULT_QUOTES_URL: &str = "https://api.schwabapi.com/marketdata/v1";
pub const DEFAULT_ACCOUNTS_URL: &str = "https://api.schwabapi.com/trader/v1/accounts";

// --- TRANSPORT DEFAULTS ---
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 2;
pub const DEFAULT_MAX_RETRIES: u32 = 0;

// --- POSITIONS ---
pub const OPTION_ASSET_TYPE: &str = "OPTION";
/// Shares per listed option contract, applied to option cost basis
pub const OPTION_CONTRACT_MULTIPLIER: i64 = 100;
pub const UNKNOWN_ACCOUNT: &str = "UNKNOWN";

/// Minimum length of a packed OCC-style option identifier
pub const OCC_SYMBOL_MIN_LEN: usize = 21;

/// Column order of the exported positions table
pub const POSITION_HEADERS: [&str; 36] = [
    "accountId",
    "symbol",
    "cusip",
    "description",
    "assetType",
    "longQuantity",
    "shortQuantity",
    "netQuantity",
    "averagePrice",
    "marketValue",
    "maintenanceRequirement",
    "averageLongPrice",
    "longOpenProfitLoss",
    "shortOpenProfitLoss",
    "netOpenProfitLoss",
    "costBasis",
    "currentDayProfitLoss",
    "currentDayProfitLossPct",
    "delta",
    "theta",
    "volatility",
    "totalVolume",
    "openInterest",
    "timeValue",
    "highPrice",
    "lowPrice",
    "closePrice",
    "deliverableUnits",
    "theoreticalVolatility",
    "UnderlyingPrice",
    "DivYield",
    "DivAmount",
    "DivExDate",
    "LastEarningsDate",
    "NextDivExDate",
    "DTE",
];
