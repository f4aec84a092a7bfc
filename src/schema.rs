//! Static description of the dashboard's views and login roles.

use serde::{Deserialize, Serialize};

/// Columns a user may edit. Every loaded table is guaranteed to have them.
pub const EDITABLE_COLUMNS: [&str; 3] = ["Clearance Date", "Remarks", "Support Required"];

pub const CLEARANCE_DATE: &str = "Clearance Date";

pub const NATION_COLUMN: &str = "Nation";
pub const ZONE_COLUMN: &str = "Zone";
pub const CSM_COLUMN: &str = "CSM Updated";

/// Columns kept from the Appreciation (testimonial) tab, besides the role columns.
pub const APPRECIATION_COLUMNS: [&str; 12] = [
    "CSM Names",
    "Date",
    "Month",
    "Id",
    "RE Name",
    "Zone",
    "Customer Name",
    "City",
    "Segment",
    "Product",
    "MSC ID",
    "Testimonial Type",
];

/// Login role. The label doubles as the column holding each row's owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    CsmUpdated,
    Nation,
    AllIndia,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::CsmUpdated, Role::Nation, Role::AllIndia];

    pub fn label(self) -> &'static str {
        match self {
            Role::CsmUpdated => "CSM Updated",
            Role::Nation => "Nation",
            Role::AllIndia => "All India",
        }
    }

    pub fn column(self) -> &'static str {
        self.label()
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Role::ALL.into_iter().find(|r| r.label() == label)
    }
}

/// One of the seven named tables the dashboard can show.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum View {
    #[default]
    Complaint,
    OpenSites,
    StockLiquidation,
    DrawingHold,
    FgStatus,
    Reorder,
    Appreciation,
}

impl View {
    pub const ALL: [View; 7] = [
        View::Complaint,
        View::OpenSites,
        View::StockLiquidation,
        View::DrawingHold,
        View::FgStatus,
        View::Reorder,
        View::Appreciation,
    ];

    /// The table identities are resolved from.
    pub const ROSTER: View = View::DrawingHold;

    pub fn label(self) -> &'static str {
        match self {
            View::Complaint => "Open - Complaint - SR",
            View::OpenSites => "Open Sites",
            View::StockLiquidation => "Stock Liquidation Project",
            View::DrawingHold => "Drawing Hold Status",
            View::FgStatus => "FG Status",
            View::Reorder => "Reorder",
            View::Appreciation => "Appreciation",
        }
    }

    /// Worksheet the view is read from.
    pub fn source_tab(self) -> &'static str {
        match self {
            View::Complaint => "Complaint-Final",
            View::OpenSites => "Open-Sites-Final",
            View::StockLiquidation => "Project Stock at Site-Final",
            View::DrawingHold => "WCS-Final",
            View::FgStatus => "FG-Final",
            View::Reorder => "Reorder",
            View::Appreciation => "Testimonial",
        }
    }

    /// Column used for the descending age sort, if any.
    pub fn ageing_column(self) -> Option<&'static str> {
        match self {
            View::Complaint => Some("Ticket Ageing"),
            View::OpenSites | View::StockLiquidation | View::FgStatus => Some("Aging"),
            View::DrawingHold => Some("Hold Age"),
            View::Reorder | View::Appreciation => None,
        }
    }

    /// Age below which a row counts as fresh. Views without one are not styled.
    pub fn ageing_threshold(self) -> Option<f64> {
        match self {
            View::Complaint => Some(20.0),
            View::OpenSites | View::StockLiquidation => Some(25.0),
            _ => None,
        }
    }

    pub fn projection(self) -> Option<&'static [&'static str]> {
        match self {
            View::Appreciation => Some(&APPRECIATION_COLUMNS),
            _ => None,
        }
    }

    /// URL-safe key used in query strings and forms.
    pub fn slug(self) -> &'static str {
        match self {
            View::Complaint => "complaint",
            View::OpenSites => "open-sites",
            View::StockLiquidation => "stock-liquidation",
            View::DrawingHold => "drawing-hold",
            View::FgStatus => "fg-status",
            View::Reorder => "reorder",
            View::Appreciation => "appreciation",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        View::ALL.into_iter().find(|v| v.slug() == slug)
    }
}
