// Payload sniffing: rejects bodies that cannot be the requested resource.

pub mod payload;
