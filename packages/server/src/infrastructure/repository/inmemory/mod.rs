mod meeting;

pub use meeting::InMemoryMeetingRepository;
