//! Numeric reply codes for the chat service.
//!
//! The set is the one the period clients actually consume — a small
//! IRC-derived core plus the vendor extensions for locale, codepage,
//! game listings, paging, and user lookup.

pub const RPL_GETLOCALE: u16 = 309;
pub const RPL_SETLOCALE: u16 = 310;
pub const RPL_LISTSTART: u16 = 321;
pub const RPL_ENDOFLIST: u16 = 323;
pub const RPL_LISTGAME: u16 = 326;
pub const RPL_LIST: u16 = 327;
pub const RPL_CODEPAGE: u16 = 328;
pub const RPL_CODEPAGESET: u16 = 329;
pub const RPL_TOPIC: u16 = 332;
pub const RPL_NAMREPLY: u16 = 353;
pub const RPL_ENDOFNAMES: u16 = 366;
pub const RPL_MOTD: u16 = 372;
pub const RPL_MOTDSTART: u16 = 375;
pub const RPL_ENDOFMOTD: u16 = 376;
pub const RPL_PAGE: u16 = 389;
pub const RPL_FINDUSEREX: u16 = 398;

pub const ERR_NOSUCHNICK: u16 = 401;
pub const ERR_NOSUCHCHANNEL: u16 = 403;
pub const ERR_NONICKNAMEGIVEN: u16 = 431;
pub const ERR_ERRONEUSNICKNAME: u16 = 432;
pub const ERR_NICKNAMEINUSE: u16 = 433;
pub const ERR_USERNOTINCHANNEL: u16 = 441;
pub const ERR_NOTONCHANNEL: u16 = 442;
pub const ERR_NEEDMOREPARAMS: u16 = 461;
pub const ERR_ALREADYREGISTERED: u16 = 462;
pub const ERR_PASSWDMISMATCH: u16 = 464;
pub const ERR_CHANNELISFULL: u16 = 471;
pub const ERR_BANNEDFROMCHAN: u16 = 474;
pub const ERR_BADCHANNELKEY: u16 = 475;
pub const ERR_CHANOPRIVSNEEDED: u16 = 482;
