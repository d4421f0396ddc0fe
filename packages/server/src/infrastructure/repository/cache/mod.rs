mod meeting;

pub use meeting::RedisMeetingRepository;
