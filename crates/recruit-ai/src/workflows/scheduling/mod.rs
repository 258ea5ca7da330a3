//! Interview auto-scheduling over a fixed daily slot grid.

pub mod allocator;
pub mod governor;
pub mod router;
pub mod service;
pub mod slots;

pub use allocator::{
    booked_slots, eligible_for, is_weekend, next_business_day, plan, Assignment, SlotCursor,
    DATE_FORMAT,
};
pub use governor::WriteGovernor;
pub use router::scheduling_router;
pub use service::{
    AgendaSlot, Booking, DayAgenda, InterviewScheduler, ScheduleReport, SchedulingError,
};
pub use slots::{InvalidSlot, TimeSlot, DAILY_SLOTS};
