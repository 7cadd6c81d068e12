// Well-known WS method names — must match the web/mobile client expectations.

// handshake
pub const CONNECT: &str = "connect";

// utility
pub const PING: &str = "ping";

// rooms
pub const ROOMS_JOIN: &str = "rooms.join";
pub const ROOMS_LEAVE: &str = "rooms.leave";
pub const ROOMS_LIST: &str = "rooms.list";

// chat
pub const CHAT_SEND: &str = "chat.send";

// teams
pub const TEAMS_CREATE: &str = "teams.create";
pub const TEAMS_JOIN: &str = "teams.join";
pub const TEAMS_LEAVE: &str = "teams.leave";
pub const TEAMS_LIST: &str = "teams.list";

// challenges
pub const CHALLENGES_CREATE: &str = "challenges.create";
pub const CHALLENGES_JOIN: &str = "challenges.join";
pub const CHALLENGES_LIST: &str = "challenges.list";

// goals / progress
pub const GOALS_COMPLETE: &str = "goals.complete";

// views
pub const FEED_LIST: &str = "feed.list";
pub const LEADERBOARD_GET: &str = "leaderboard.get";
pub const NOTIFICATIONS_LIST: &str = "notifications.list";

// coach
pub const COACH_ASK: &str = "coach.ask";
