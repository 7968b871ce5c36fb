// Tue Jan 20 2026 - Alex

use crate::config::Config;
use crate::layout::{LayoutRow, LayoutView};
use crate::output::ReportFormat;
use crate::scan::{ClassFinding, Finding, Reorganized};
use std::fmt::Write as _;
use std::io::{self, Write};

fn plural(n: u64, word: &str) -> String {
    format!("{} {}{}", n, word, if n == 1 { "" } else { "s" })
}

/// C-like rendering of a layout with hole annotations and a summary.
pub fn render_layout(view: &LayoutView) -> String {
    let mut text = String::new();
    let opener = match (&view.name, &view.typedef_alias) {
        (Some(name), _) => format!("{} {} {{", view.keyword, name),
        (None, Some(_)) => format!("typedef {} {{", view.keyword),
        (None, None) => format!("{} {{", view.keyword),
    };
    let _ = writeln!(text, "{}", opener);

    for row in &view.rows {
        let _ = match row {
            LayoutRow::Member {
                type_name,
                name,
                offset,
                size,
                bits: None,
            } => writeln!(text, "\t{:<26} {:<21} /* {:5} {:5} */", type_name, format!("{};", name), offset, size),
            LayoutRow::Member {
                type_name,
                name,
                offset,
                size,
                bits: Some((bit_offset, bit_size)),
            } => writeln!(
                text,
                "\t{:<26} {:<21} /* {:5}:{:2} {:4} */",
                type_name,
                format!("{}:{};", name, bit_size),
                offset,
                bit_offset,
                size
            ),
            LayoutRow::Hole(size) => writeln!(text, "\n\t/* XXX {} hole, try to pack */\n", plural(*size, "byte")),
            LayoutRow::BitHole(bits) => writeln!(text, "\n\t/* XXX {} hole, try to pack */\n", plural(*bits, "bit")),
            LayoutRow::CachelineBoundary(line) => writeln!(
                text,
                "\t/* --- cacheline {} boundary ({} bytes) --- */",
                line,
                line * view.cacheline_size
            ),
        };
    }

    let _ = writeln!(text);
    let _ = writeln!(
        text,
        "\t/* size: {}, cachelines: {}, members: {} */",
        view.size, view.cachelines, view.nr_members
    );
    if view.nr_holes > 0 {
        let _ = writeln!(
            text,
            "\t/* sum members: {}, holes: {}, sum holes: {} */",
            view.member_bytes, view.nr_holes, view.hole_bytes
        );
    }
    if view.nr_bit_holes > 0 {
        let _ = writeln!(
            text,
            "\t/* bit holes: {}, sum bit holes: {} bits */",
            view.nr_bit_holes, view.bit_hole_bits
        );
    }
    if view.padding > 0 {
        let _ = writeln!(text, "\t/* padding: {} */", view.padding);
    }
    if view.cacheline_size > 0 {
        let last = view.size % view.cacheline_size;
        if last != 0 {
            let _ = writeln!(text, "\t/* last cacheline: {} bytes */", last);
        }
    }
    let _ = match &view.typedef_alias {
        Some(alias) if view.name.is_none() => writeln!(text, "}} {};", alias),
        _ => writeln!(text, "}};"),
    };
    text
}

/// Writes findings in the format chosen once from configuration.
pub struct Reporter<W: Write> {
    out: W,
    format: ReportFormat,
    separator: char,
    verbose: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self {
            out,
            format,
            separator: '\t',
            verbose: false,
        }
    }

    pub fn from_config(out: W, config: &Config) -> Self {
        Self::new(out, config.format)
            .with_separator(config.separator)
            .with_verbose(config.verbose)
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn report_all(&mut self, findings: &[Finding]) -> io::Result<()> {
        for finding in findings {
            self.report(finding)?;
        }
        self.out.flush()
    }

    pub fn report(&mut self, finding: &Finding) -> io::Result<()> {
        let sep = self.separator;
        match finding {
            Finding::Class(class) => self.class(class),
            Finding::Reorganized(reorg) => self.reorganized(reorg),
            Finding::Container { name, depth, count } => {
                let indent = " ".repeat(depth * 2);
                if self.verbose {
                    writeln!(self.out, "{}{}: {}", indent, name, count)
                } else {
                    writeln!(self.out, "{}{}", indent, name)
                }
            }
            Finding::PointerMember { struct_name, member } => writeln!(self.out, "{}: {}", struct_name, member),
            Finding::DefinedIn { unit } => writeln!(self.out, "{}", unit),
            Finding::Layout(view) => writeln!(self.out, "{}", render_layout(view)),
            Finding::TypeName(name) => writeln!(self.out, "{}", name),
            Finding::Aggregate { name, count } => writeln!(self.out, "{}{}{}", name, sep, count),
        }
    }

    fn class(&mut self, class: &ClassFinding) -> io::Result<()> {
        let sep = self.separator;
        let view = &class.view;
        match (self.format, class.packed) {
            (ReportFormat::Layout, _) => writeln!(self.out, "{}", render_layout(view)),
            (ReportFormat::Sizes, _) => writeln!(self.out, "{}{}{}{}{}", class.name, sep, view.size, sep, view.nr_holes),
            (ReportFormat::NameLength, _) => writeln!(self.out, "{}{}{}", class.name, sep, class.name.len()),
            (ReportFormat::MemberCount, _) => writeln!(self.out, "{}{}{}", class.name, sep, view.nr_members),
            (ReportFormat::Names, _) | (ReportFormat::Packable, None) => writeln!(self.out, "{}", class.name),
            (ReportFormat::Packable, Some(p)) => writeln!(
                self.out,
                "{}{}{}{}{}{}{}",
                class.name, sep, p.old_size, sep, p.new_size, sep, p.savings
            ),
        }
    }

    fn reorganized(&mut self, reorg: &Reorganized) -> io::Result<()> {
        for step in &reorg.steps {
            writeln!(self.out, "/* Moving '{}' to offset {} */", step.moved, step.offset)?;
            writeln!(self.out, "{}", render_layout(&step.view))?;
        }
        if reorg.savings != 0 && !reorg.steps.is_empty() {
            writeln!(self.out, "/* Final reorganized struct: */")?;
        }
        write!(self.out, "{}", render_layout(&reorg.result))?;
        if reorg.savings != 0 {
            let mut line = format!("   /* saved {}", plural(reorg.savings, "byte"));
            if reorg.cacheline_savings != 0 {
                line.push_str(&format!(" and {}", plural(reorg.cacheline_savings, "cacheline")));
            }
            writeln!(self.out, "{}! */", line)?;
        }
        writeln!(self.out)
    }
}
