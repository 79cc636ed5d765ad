pub mod catalog;
pub mod music;
pub mod visit;

pub use catalog::{
    Category, CategoryUpdate, CategoryUpdateAll, NewCategory, NewSiteGroup, OrderRequest, Site,
    SiteGroup, SiteInput, SiteOrderRequest,
};
pub use music::{MusicInput, MusicTrack};
pub use visit::{LocationCount, NewVisit, VisitRecord, VisitStats, DIRECT_REFERRER, UNKNOWN};
