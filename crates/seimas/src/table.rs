use scraper::ElementRef;

const MAX_SPAN: usize = 1000;

/// One row of a table after row and column spans have been expanded.
#[derive(Debug, Clone)]
pub(crate) struct GridRow<'a> {
    pub cells: Vec<ElementRef<'a>>,
}

impl<'a> GridRow<'a> {
    /// The `<td>` cells of the row, header cells excluded.
    pub fn data_cells(&self) -> Vec<ElementRef<'a>> {
        self.cells
            .iter()
            .copied()
            .filter(|cell| cell.value().name() == "td")
            .collect()
    }

    pub fn has_data(&self) -> bool {
        self.cells.iter().any(|cell| cell.value().name() == "td")
    }
}

fn is_cell(element: &ElementRef) -> bool {
    matches!(element.value().name(), "td" | "th")
}

fn span(cell: ElementRef, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .map_or(1, |n| n.min(MAX_SPAN))
}

/// Rows that belong to `table` itself, not to tables nested inside it.
fn table_rows(table: ElementRef) -> Vec<ElementRef> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn take_carried<'a>(
    carried: &mut [Option<(ElementRef<'a>, usize)>],
    col: usize,
) -> Option<ElementRef<'a>> {
    let slot = carried.get_mut(col)?;
    let (cell, remaining) = slot.take()?;
    if remaining > 1 {
        *slot = Some((cell, remaining - 1));
    }
    Some(cell)
}

/// Expands `rowspan` and `colspan` so that every grid position holds the
/// cell covering it.
pub(crate) fn unspan(table: ElementRef<'_>) -> Vec<GridRow<'_>> {
    let mut carried: Vec<Option<(ElementRef, usize)>> = Vec::new();
    let mut grid = Vec::new();

    for row in table_rows(table) {
        let mut own_cells = row.children().filter_map(ElementRef::wrap).filter(is_cell);
        let mut cells = Vec::new();
        let mut col = 0;

        loop {
            if let Some(cell) = take_carried(&mut carried, col) {
                cells.push(cell);
                col += 1;
                continue;
            }
            let Some(cell) = own_cells.next() else {
                break;
            };
            let rowspan = span(cell, "rowspan");
            for _ in 0..span(cell, "colspan") {
                if carried.len() <= col {
                    carried.resize(col + 1, None);
                }
                carried[col] = (rowspan > 1).then_some((cell, rowspan - 1));
                cells.push(cell);
                col += 1;
            }
        }

        // spans from earlier rows that sit to the right of this row's own cells
        while col < carried.len() {
            if let Some(cell) = take_carried(&mut carried, col) {
                cells.push(cell);
            }
            col += 1;
        }

        grid.push(GridRow { cells });
    }

    grid
}
