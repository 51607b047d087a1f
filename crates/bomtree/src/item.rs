use anyhow::{Result, anyhow, bail};
use bomtree_core::{
    BomNodePatch, CustomValue, ItemType, LifecycleStatus, NewBomNode, ProcurementStatus,
};
use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use colored::Colorize;
use rust_decimal::Decimal;

use crate::context::Context;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Project id or name
    #[arg(short, long)]
    project: String,

    part_number: String,

    description: String,

    /// Units per parent unit
    #[arg(short, long, default_value_t = 1)]
    quantity: u32,

    /// assembly, subassembly or part
    #[arg(short = 't', long = "type", default_value = "part")]
    item_type: ItemType,

    /// Part number of the parent item
    #[arg(long)]
    parent: Option<String>,

    #[command(flatten)]
    procurement: ProcurementArgs,
}

/// Commercial and stock flags shared by `add` and `update`.
#[derive(Args, Debug, Default)]
struct ProcurementArgs {
    #[arg(long)]
    supplier: Option<String>,
    #[arg(long)]
    manufacturer: Option<String>,
    #[arg(long = "mpn")]
    manufacturer_part_number: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    /// Estimated unit cost
    #[arg(long)]
    cost: Option<Decimal>,
    #[arg(long)]
    actual_cost: Option<Decimal>,
    /// pending, in_progress, completed or delayed
    #[arg(long)]
    status: Option<ProcurementStatus>,
    #[arg(long)]
    lifecycle: Option<LifecycleStatus>,
    /// Expected delivery date (YYYY-MM-DD)
    #[arg(long)]
    delivery: Option<NaiveDate>,
    #[arg(long)]
    received: Option<NaiveDate>,
    #[arg(long)]
    obsolete: Option<bool>,
    #[arg(long)]
    critical: Option<bool>,
    #[arg(long)]
    stock: Option<u32>,
    #[arg(long)]
    reorder_point: Option<u32>,
    #[arg(long)]
    safety_stock: Option<u32>,
    #[arg(long)]
    location: Option<String>,
}

impl ProcurementArgs {
    fn into_patch(self) -> BomNodePatch {
        BomNodePatch {
            supplier: self.supplier.map(Some),
            manufacturer: self.manufacturer.map(Some),
            manufacturer_part_number: self.manufacturer_part_number.map(Some),
            category: self.category.map(Some),
            notes: self.notes.map(Some),
            estimated_cost: self.cost.map(Some),
            actual_cost: self.actual_cost.map(Some),
            procurement_status: self.status,
            lifecycle_status: self.lifecycle,
            expected_delivery: self.delivery.map(Some),
            received_date: self.received.map(Some),
            obsolete: self.obsolete,
            critical: self.critical,
            stock_quantity: self.stock,
            reorder_point: self.reorder_point,
            safety_stock: self.safety_stock,
            inventory_location: self.location.map(Some),
            ..Default::default()
        }
    }

    fn apply_to(self, dto: &mut NewBomNode) {
        let p = &mut dto.procurement;
        let inv = &mut dto.inventory;
        p.supplier = self.supplier;
        p.manufacturer = self.manufacturer;
        p.manufacturer_part_number = self.manufacturer_part_number;
        p.category = self.category;
        p.notes = self.notes;
        p.estimated_cost = self.cost;
        p.actual_cost = self.actual_cost;
        p.expected_delivery = self.delivery;
        p.received_date = self.received;
        if let Some(status) = self.status {
            p.procurement_status = status;
        }
        if let Some(lifecycle) = self.lifecycle {
            p.lifecycle_status = lifecycle;
        }
        p.obsolete = self.obsolete.unwrap_or_default();
        p.critical = self.critical.unwrap_or_default();
        inv.stock_quantity = self.stock.unwrap_or_default();
        inv.reorder_point = self.reorder_point.unwrap_or_default();
        inv.safety_stock = self.safety_stock.unwrap_or_default();
        inv.inventory_location = self.location;
    }
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Project id or name
    #[arg(short, long)]
    project: String,

    part_number: String,

    /// New part number
    #[arg(long)]
    rename: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(short, long)]
    quantity: Option<u32>,

    #[arg(short = 't', long = "type")]
    item_type: Option<ItemType>,

    /// Empty an optional field
    #[arg(long, value_name = "FIELD")]
    clear: Vec<ClearField>,

    #[command(flatten)]
    procurement: ProcurementArgs,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ClearField {
    Supplier,
    Manufacturer,
    Mpn,
    Category,
    Notes,
    Cost,
    ActualCost,
    Delivery,
    Received,
    Location,
}

impl ClearField {
    fn apply(self, patch: &mut BomNodePatch) {
        match self {
            ClearField::Supplier => patch.supplier = Some(None),
            ClearField::Manufacturer => patch.manufacturer = Some(None),
            ClearField::Mpn => patch.manufacturer_part_number = Some(None),
            ClearField::Category => patch.category = Some(None),
            ClearField::Notes => patch.notes = Some(None),
            ClearField::Cost => patch.estimated_cost = Some(None),
            ClearField::ActualCost => patch.actual_cost = Some(None),
            ClearField::Delivery => patch.expected_delivery = Some(None),
            ClearField::Received => patch.received_date = Some(None),
            ClearField::Location => patch.inventory_location = Some(None),
        }
    }
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Project id or name
    #[arg(short, long)]
    project: String,

    part_number: String,
}

#[derive(Args, Debug)]
pub struct FieldArgs {
    #[command(subcommand)]
    command: FieldCommand,
}

#[derive(Subcommand, Debug)]
enum FieldCommand {
    /// Set a custom field
    Set {
        #[arg(short, long)]
        project: String,
        part_number: String,
        name: String,
        value: String,
        /// string, number, date, boolean or select
        #[arg(long, default_value = "string")]
        kind: String,
    },

    /// Remove a custom field
    #[command(alias = "rm")]
    Remove {
        #[arg(short, long)]
        project: String,
        part_number: String,
        name: String,
    },
}

pub fn execute_add(ctx: &Context, args: AddArgs) -> Result<()> {
    let project = ctx.project(&args.project)?;
    let service = ctx.service();

    let mut dto = NewBomNode::new(
        project.id,
        args.part_number,
        args.description,
        args.quantity,
        args.item_type,
    );
    if let Some(parent) = &args.parent {
        dto.parent_id = Some(service.resolve_parent(project.id, parent)?.id);
    }
    args.procurement.apply_to(&mut dto);

    let node = service.create_item(&dto)?;
    println!(
        "{} {} {} at {}",
        "Added".green(),
        node.item_type,
        node.part_number.bold(),
        node.path
    );
    Ok(())
}

pub fn execute_update(ctx: &Context, args: UpdateArgs) -> Result<()> {
    let project = ctx.project(&args.project)?;
    let node = ctx.item(&project, &args.part_number)?;

    let mut patch = BomNodePatch {
        part_number: args.rename,
        description: args.description,
        quantity: args.quantity,
        item_type: args.item_type,
        ..args.procurement.into_patch()
    };
    for field in args.clear {
        field.apply(&mut patch);
    }
    if patch.is_empty() {
        bail!("Nothing to update; pass at least one field flag");
    }

    let node = ctx.service().update_item(node.id, &patch)?;
    println!("{} {}", "Updated".green(), node.part_number.bold());
    Ok(())
}

pub fn execute_delete(ctx: &Context, args: DeleteArgs) -> Result<()> {
    let project = ctx.project(&args.project)?;
    let node = ctx.item(&project, &args.part_number)?;
    ctx.service().delete_item(node.id)?;
    println!("{} {}", "Deleted".green(), node.part_number.bold());
    Ok(())
}

pub fn execute_field(ctx: &Context, args: FieldArgs) -> Result<()> {
    match args.command {
        FieldCommand::Set {
            project,
            part_number,
            name,
            value,
            kind,
        } => {
            let project = ctx.project(&project)?;
            let node = ctx.item(&project, &part_number)?;
            let value = CustomValue::from_parts(&kind, &value)
                .ok_or_else(|| anyhow!("'{value}' is not a valid {kind} value"))?;
            ctx.service().set_custom_field(node.id, &name, &value)?;
            println!("{} {name} = {value} on {}", "Set".green(), node.part_number);
        }
        FieldCommand::Remove {
            project,
            part_number,
            name,
        } => {
            let project = ctx.project(&project)?;
            let node = ctx.item(&project, &part_number)?;
            if !ctx.service().remove_custom_field(node.id, &name)? {
                bail!("{} has no field '{name}'", node.part_number);
            }
            println!("{} {name} from {}", "Removed".green(), node.part_number);
        }
    }
    Ok(())
}
